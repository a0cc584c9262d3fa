use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::genotype::{ConversionSummary, GenotypeTable, MISSING};

const IO_BUF_CAPACITY: usize = 1 << 20; // 1 MiB

pub fn write_genotype_table(path: &Path, table: &GenotypeTable) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::with_capacity(IO_BUF_CAPACITY, file);
    render_genotype_table(&mut w, table)?;
    w.flush()?;
    Ok(())
}

pub fn render_genotype_table(w: &mut dyn Write, table: &GenotypeTable) -> Result<()> {
    write!(w, "IID")?;
    for col in &table.columns {
        write!(w, "\t{}", col)?;
    }
    writeln!(w)?;

    for row in &table.rows {
        write!(w, "{}", row.iid)?;
        for count in &row.counts {
            match count {
                Some(n) => write!(w, "\t{}", n)?,
                None => write!(w, "\t{}", MISSING)?,
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn write_summary(path: &Path, summary: &ConversionSummary) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "Conversion Summary")?;
    writeln!(w, "==================")?;
    writeln!(w, "Input raw file: {}", summary.raw_path.display())?;
    match (&summary.metadata_path, summary.metadata_loaded) {
        (Some(p), true) => writeln!(w, "Input BIM file: {}", p.display())?,
        (Some(p), false) if p.exists() => {
            writeln!(w, "Input BIM file: {} (unreadable)", p.display())?
        }
        (Some(p), false) => writeln!(w, "Input BIM file: {} (not found)", p.display())?,
        (None, _) => writeln!(w, "Input BIM file: none")?,
    }
    writeln!(w, "Output file: {}", summary.output_path.display())?;
    writeln!(w, "Total samples: {}", summary.samples())?;
    writeln!(w, "Total variants: {}", summary.output_variants)?;
    writeln!(w, "Input variants: {}", summary.input_variants)?;
    if let Some(join) = &summary.join {
        writeln!(w, "Matched variants: {}", join.matched)?;
        writeln!(
            w,
            "Unmatched variants: {} ({})",
            join.unmatched.len(),
            summary.policy.as_str()
        )?;
        if !join.unmatched.is_empty() {
            writeln!(w, "Unmatched columns: {}", join.unmatched.join(", "))?;
        }
    }
    if summary.metadata_skipped_lines > 0 {
        writeln!(w, "Skipped BIM lines: {}", summary.metadata_skipped_lines)?;
    }
    writeln!(w, "Invalid genotype values: {}", summary.issues.invalid_values)?;
    writeln!(w, "Padded rows: {}", summary.issues.short_rows)?;
    writeln!(w, "Truncated rows: {}", summary.issues.long_rows)?;
    writeln!(w, "Sample IDs: {}", summary.sample_ids.join(", "))?;
    w.flush()?;
    Ok(())
}
