use super::{json_pretty, read_batch, BatchRead, ReadArgs, EXIT_SUCCESS};
use manifold_schema::ObjectIdentity;

pub fn run(args: &ReadArgs, json: bool) -> Result<u8, String> {
    let objects = match read_batch(args)? {
        BatchRead::Objects(objects) => objects,
        BatchRead::Failed(code) => return Ok(code),
    };
    let identities: Vec<ObjectIdentity> = objects.iter().map(ObjectIdentity::of).collect();

    if json {
        let report = serde_json::json!({
            "sources": args.sources.len(),
            "objects": identities,
        });
        println!("{}", json_pretty(&report)?);
    } else {
        for identity in &identities {
            println!("{identity}");
        }
        println!(
            "ok: {} objects from {} sources",
            identities.len(),
            args.sources.len()
        );
    }
    Ok(EXIT_SUCCESS)
}
