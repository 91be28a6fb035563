use super::{json_pretty, read_batch, BatchRead, OutputFormat, ReadArgs, EXIT_SUCCESS};
use manifold_core::Resource;
use serde_json::{json, Value};

pub fn run(args: &ReadArgs, format: OutputFormat) -> Result<u8, String> {
    let objects = match read_batch(args)? {
        BatchRead::Objects(objects) => objects,
        BatchRead::Failed(code) => return Ok(code),
    };
    match format {
        OutputFormat::Yaml => print!("{}", render_yaml(&objects)?),
        OutputFormat::Json => println!("{}", render_json(objects)?),
    }
    Ok(EXIT_SUCCESS)
}

/// One YAML document per resource, each opened with `---`.
fn render_yaml(objects: &[Resource]) -> Result<String, String> {
    let mut out = String::new();
    for object in objects {
        let doc = serde_yaml::to_string(object)
            .map_err(|e| format!("YAML serialization failed: {e}"))?;
        out.push_str("---\n");
        out.push_str(&doc);
    }
    Ok(out)
}

/// All resources wrapped in a single `v1` `List`.
fn render_json(objects: Vec<Resource>) -> Result<String, String> {
    let items: Vec<Value> = objects.into_iter().map(Value::Object).collect();
    json_pretty(&json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": items,
    }))
}
