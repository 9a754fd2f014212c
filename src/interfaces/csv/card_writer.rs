use serde::Serialize;
use std::io::Write;

/// One line of the card report. Numbers only ever appear masked.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CardRow {
    pub card: String,
    pub owner: String,
    pub number: String,
    pub expiry: String,
    pub status: String,
    pub balance: String,
}

/// Writes card rows as CSV with a header line.
pub struct CardWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CardWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_cards(&mut self, rows: impl IntoIterator<Item = CardRow>) -> csv::Result<()> {
        let mut wrote_any = false;
        for row in rows {
            self.writer.serialize(row)?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer
                .write_record(["card", "owner", "number", "expiry", "status", "balance"])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
