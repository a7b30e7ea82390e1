#[derive(Debug, Clone)]
pub enum Progress {
    Spawned { command: String },
    Stage { name: String },
    Output(String),
    Exited { code: Option<i32> },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

/// Recognizes the worker's stage headers (`Step 3: Running force field
/// parameterization...`) and returns the stage description.
pub fn stage_header(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("Step ")?;
    let (number, description) = rest.split_once(':')?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let description = description.trim().trim_end_matches('.').trim_end();
    (!description.is_empty()).then_some(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_a_no_op() {
        ProgressReporter::new().report(Progress::Output("ignored".into()));
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = Mutex::new(Vec::new());
        {
            let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
                if let Progress::Output(line) = event {
                    seen.lock().unwrap().push(line);
                }
            }));
            reporter.report(Progress::Output("a".into()));
            reporter.report(Progress::Exited { code: Some(0) });
            reporter.report(Progress::Output("b".into()));
        }
        assert_eq!(seen.into_inner().unwrap(), ["a", "b"]);
    }

    #[test]
    fn stage_headers_are_recognized() {
        assert_eq!(
            stage_header("Step 2: Adding water (solvation)..."),
            Some("Adding water (solvation)")
        );
        assert_eq!(
            stage_header("\nStep 5: Running MD simulation..."),
            Some("Running MD simulation")
        );
        assert_eq!(stage_header("Step two: nope"), None);
        assert_eq!(stage_header("Step 1:"), None);
        assert_eq!(stage_header("MD steps: 1000"), None);
    }
}
