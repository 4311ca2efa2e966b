use csv::{ByteRecord, ReaderBuilder};
use std::{io, io::{BufRead, Write}, path::Path};
use tracing::debug;
use super::error::IngestError;
use super::parser::Parser;

// sanitized header plus the rows of our category, in file order
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// read csv, the first record is the header whatever it contains
// rows of other categories are dropped, field counts are not checked
pub fn read_dataset(filename: &Path, parser: &Parser) -> Result<Dataset, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(filename)?;
    println!("  ## Chapter {}: Opened CSV", parser.category());

    let mut records = reader.byte_records();
    let header = match records.next() {
        Some(record) => parser.build_header(&to_fields(&record?)),
        None => return Err(IngestError::EmptyInput(filename.display().to_string())),
    };

    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in records {
        match parser.parse_row(&to_fields(&record?)) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    debug!(kept = rows.len(), skipped = skipped, "filtered csv rows");
    println!("\n  ## {} rows: Closed CSV", rows.len());

    Ok(Dataset { header, rows })
}

// exports are not always valid utf-8
fn to_fields(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

// show one row column by column and ask whether to continue
pub fn preview_row(columns: &[&str], row: &[String]) -> io::Result<bool> {
    println!("Preview the first row:");
    for (column, value) in columns.iter().zip(row.iter()) {
        println!("  {}: {}", column, value);
    }
    if row.len() != columns.len() {
        println!("  ({} values for {} columns)", row.len(), columns.len());
    }

    let stdin = io::stdin();
    let answer = read_yes_or_no(&mut stdin.lock(), &mut io::stdout(), "Does the row look correct?", true)?;
    println!();
    Ok(answer)
}

// read a boolean (yes or no)
pub fn read_yes_or_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt_text: &str, default: bool) -> io::Result<bool> {
    if default {
        write!(output, "{} (Y/n):", prompt_text)?;
    } else {
        write!(output, "{} (N/y):", prompt_text)?;
    }
    output.flush()?;

    let mut text = String::new();
    input.read_line(&mut text)?;

    Ok(match text.trim().to_lowercase().chars().next() {
        Some(c) => c == 'y',
        None => default,
    })
}

pub struct ProgressPrinter<W: Write> {
    current_percentage: usize,
    total_count: usize,
    output: W,
}

// helper to print progress
// example of 12%
// ==========:10%
// ==
impl<W: Write> ProgressPrinter<W> {
    pub fn new(total_count: usize, output: W) -> ProgressPrinter<W> {
        ProgressPrinter {
            current_percentage: 0,
            total_count: total_count,
            output: output,
        }
    }

    pub fn update_progress(&mut self, updated_count: usize) -> io::Result<()> {
        if self.total_count == 0 {
            return Ok(());
        }

        let updated_percentage = (100 * updated_count.min(self.total_count)) / self.total_count;

        while self.current_percentage < updated_percentage {
            self.current_percentage += 1;
            write!(self.output, "=")?;
            if self.current_percentage % 10 == 0 {
                writeln!(self.output, ":{}%", self.current_percentage)?;
            }
        }
        self.output.flush()
    }
}
