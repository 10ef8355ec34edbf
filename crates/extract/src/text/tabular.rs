use crate::{Chunk, Error};

/// One chunk per record, fields joined by `", "`. There is no header row.
pub fn process_csv(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(data);

    let mut chunks = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.iter().collect::<Vec<_>>().join(", ");
        chunks.push(Chunk::new(line, source));
    }
    Ok(chunks)
}
