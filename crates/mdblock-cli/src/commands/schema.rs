use crate::cli::SchemaArgs;
use crate::error::Result;
use mdblock::core::schema::md_simulation_block;
use tracing::info;

pub fn run(args: SchemaArgs) -> Result<()> {
    let spec = md_simulation_block();
    info!("Rendering schema for block '{}'.", spec.id);
    println!("{}", render(&spec, args.pretty)?);
    Ok(())
}

fn render<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn rendered_schema_lists_every_slot() {
        let text = render(&md_simulation_block(), false).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(doc["id"], "md_simulation_setup");
        assert_eq!(doc["inputs"].as_array().unwrap().len(), 2);
        assert_eq!(doc["outputs"].as_array().unwrap().len(), 2);
        let variables = doc["variables"].as_array().unwrap();
        assert!(variables.iter().any(|v| v["id"] == "conda_env"));
    }

    #[test]
    fn pretty_output_spans_lines() {
        let text = render(&md_simulation_block(), true).unwrap();
        assert!(text.lines().count() > 10);
    }
}
