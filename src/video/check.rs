use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::json;

use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

use super::cli::CheckArgs;
use super::input::{QaPair, read_qa_file};
use super::utils::{canonicalize_existing, snippet};

pub fn handle_check(args: CheckArgs) -> Result<()> {
    let csv_path = canonicalize_existing(&args.csv)?;
    let table = read_qa_file(&csv_path)
        .with_context(|| format!("Failed to read Q&A pairs from {}", csv_path.display()))?;

    emit(
        Level::Success,
        "video.check.valid",
        &format!(
            "{} is valid: {} Q&A pair(s), {} encoding",
            csv_path.display(),
            table.pairs.len(),
            table.encoding
        ),
        Some(json!({
            "pairs": table.pairs,
            "encoding": table.encoding.to_string(),
        })),
    );

    if get_output_format() == OutputFormat::Text {
        println!("{}", pairs_table(&table.pairs));
    }

    Ok(())
}

fn pairs_table(pairs: &[QaPair]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Row", "Question", "Answer"]);

    for pair in pairs {
        table.add_row(vec![
            pair.index.to_string(),
            snippet(&pair.question),
            snippet(&pair.answer),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_pair() {
        let pairs = vec![
            QaPair {
                index: 1,
                question: "What is 2+2?".to_string(),
                answer: "4".to_string(),
            },
            QaPair {
                index: 2,
                question: "Capital of France?".to_string(),
                answer: "Paris".to_string(),
            },
        ];

        let rendered = pairs_table(&pairs).to_string();
        assert!(rendered.contains("What is 2+2?"));
        assert!(rendered.contains("Paris"));
        assert_eq!(pairs_table(&pairs).row_iter().count(), 2);
    }
}
