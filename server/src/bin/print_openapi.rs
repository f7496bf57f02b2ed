use eyre::Result;
use utoipa::OpenApi;

use galleria::openapi;

fn to_camel_case(s: &str) -> String {
    let mut cs = String::with_capacity(s.len());
    let mut it = s.chars().peekable();
    while let Some(c) = it.next() {
        match (c, it.peek()) {
            ('_', Some(nc)) if *nc != '_' => {
                cs.push(nc.to_ascii_uppercase());
                let _ = it.next(); // consume nc
            }
            (c, _) => {
                cs.push(c);
            }
        }
    }
    cs
}

fn main() -> Result<()> {
    let mut oapi: utoipa::openapi::OpenApi = openapi::ApiDoc::openapi();
    // operationIds are camelCase for the generated client
    oapi.paths.paths.iter_mut().for_each(|(_path, path_item)| {
        path_item.operations.iter_mut().for_each(|(_, op)| {
            op.operation_id = op.operation_id.as_ref().map(|name| to_camel_case(name));
        });
    });
    println!("{}", oapi.to_pretty_json()?);
    Ok(())
}
