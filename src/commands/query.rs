use crate::config::PipelineConfig;
use crate::pipeline::StageId;
use crate::storage::{RecordFilter, RecordStore, SqliteRecordStore};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Write matching records of `table` to `out`, one JSON object per line.
/// Returns the number written.
pub fn write_records(
    store: &dyn RecordStore,
    table: StageId,
    filters: &[(String, String)],
    limit: Option<usize>,
    out: &mut dyn Write,
) -> Result<usize> {
    let filter = filters
        .iter()
        .fold(RecordFilter::all(), |filter, (field, value)| {
            filter.eq(field, value.as_str())
        });
    let records = store.query(table.record_table(), &filter)?;

    let mut written = 0;
    for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}

pub fn handle_query(
    config: &PipelineConfig,
    table: StageId,
    filters: &[(String, String)],
    database: Option<&Path>,
    limit: Option<usize>,
) -> Result<()> {
    let path = database.map_or_else(|| config.database_path(), Path::to_path_buf);
    let store = SqliteRecordStore::open(&path)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = write_records(&store, table, filters, limit, &mut out)?;
    log::info!("{} {} record(s)", written, table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryRecordStore, NaturalKey};
    use serde_json::{json, Value};

    #[test]
    fn test_filters_and_limit() {
        let store = MemoryRecordStore::new();
        for (id, season) in [(9, "2023-2024"), (9, "2024-2025"), (11, "2024-2025")] {
            let fields = json!({"competition_id": id, "season": season});
            store
                .upsert(
                    "season",
                    &NaturalKey::new().with("competition_id", id).with("season", season),
                    fields.as_object().unwrap(),
                )
                .unwrap();
        }

        let mut out = Vec::new();
        let written = write_records(
            &store,
            StageId::Season,
            &[("competition_id".into(), "9".into())],
            None,
            &mut out,
        )
        .unwrap();
        assert_eq!(written, 2);

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["fields"]["season"], "2023-2024");
        assert_eq!(lines[1]["key"], "competition_id=9|season=2024-2025");

        let mut limited = Vec::new();
        let written =
            write_records(&store, StageId::Season, &[], Some(1), &mut limited).unwrap();
        assert_eq!(written, 1);
    }
}
