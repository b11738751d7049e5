//! Root command implementation.

use sensorseal_pipeline::{batch_root, partition};
use serde_json::json;

use crate::input::read_request;
use crate::output::{format_json, format_root_row, print_root_header};

pub fn run(
    input: Option<String>,
    chunk_size: Option<i64>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = read_request(input.as_deref())?;
    if chunk_size.is_some() {
        request.chunk_size = chunk_size;
    }
    let readings = request.readings()?;
    let chunk_size = request.chunk_size()?;

    let mut rows = Vec::new();
    for (index, batch) in partition(&readings, chunk_size)?.enumerate() {
        rows.push((index + 1, batch.len(), batch_root(batch)?));
    }

    if json_output {
        let batches: Vec<_> = rows
            .iter()
            .map(|(batch, count, root)| {
                json!({"batch": batch, "count": count, "merkleRoot": root})
            })
            .collect();
        println!("{}", format_json(&batches));
    } else {
        print_root_header();
        for (batch, count, root) in &rows {
            println!("{}", format_root_row(*batch, *count, &root.to_hex()));
        }
    }
    Ok(())
}
