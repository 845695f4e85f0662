//! Line-oriented record reading shared by the timeline and step file parsers.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::Result;

/// Split `reader` into `delimiter`-separated records, each tagged with the
/// 1-based physical line it starts on.
///
/// The csv reader skips blank lines and its own line counter does not see
/// them, so lines are counted here from the record byte offsets instead.
pub(crate) fn read_records<R: Read>(
    mut reader: R,
    delimiter: u8,
) -> Result<Vec<(u64, StringRecord)>> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(input.as_slice());

    let mut records = Vec::new();
    let mut cursor = 0;
    let mut line = 1;
    for record in rdr.records() {
        let record = record?;
        let from = record
            .position()
            .map_or(cursor, |p| p.byte() as usize)
            .max(cursor);
        // Offsets point before any skipped line terminators.
        let start = input[from..]
            .iter()
            .position(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(input.len(), |skip| from + skip);

        line += input[cursor..start].iter().filter(|&&b| b == b'\n').count() as u64;
        cursor = start;
        records.push((line, record));
    }
    Ok(records)
}
