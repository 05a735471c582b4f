//! Tabular import/export codec.
//!
//! The interchange format is delimited UTF-8 text with a fixed 7-column
//! schema. On import, rows sharing a SKU are merged into one item carrying
//! all of their variants; on export, every `(item, variant)` pair becomes one
//! row. Import is lenient (quoted fields, flag/quantity fallbacks, skipped
//! malformed rows); export writes values unquoted. A field containing the
//! delimiter therefore does not round-trip — a known, accepted asymmetry.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::ParseError;
use crate::inventory::{InventoryItem, SizeVariant};

/// Column delimiter.
pub const DELIMITER: char = ',';

/// The exact header row, written first on export and expected on import.
pub const HEADER: &str = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL";

/// Minimum number of resolved fields for a row to be usable (IMAGE_URL may be
/// absent).
const MIN_FIELDS: usize = 6;

/// File extension accepted on import and used on export.
pub const FILE_EXTENSION: &str = ".csv";

/// Declared content types accepted on import.
pub const IMPORT_CONTENT_TYPES: [&str; 2] = ["text/csv", "application/vnd.ms-excel"];

/// Result of a successful parse: merged items plus the count of malformed
/// rows that were skipped (never escalated).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub items: Vec<InventoryItem>,
    pub skipped_rows: usize,
}

/// Split one line on the delimiter, honoring double-quoted fields.
///
/// Quoting state is toggled character by character; the delimiter splits only
/// outside quotes, so `"M,L"` resolves to the single field `M,L`.
fn split_delimited(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == DELIMITER && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Lenient stock-flag parse: case-insensitive `true`/`false` or `1`/`0`,
/// anything else reads as out of stock.
fn parse_stock_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// Lenient quantity parse, defaulting to 0 on failure.
fn parse_quantity(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

/// Parse delimited text into items, merging rows by SKU.
///
/// Rows are folded in file order: the first row for a SKU creates the item
/// (title and image URL are taken from it), and every row for that SKU —
/// first or subsequent — appends its variants in row order. The returned
/// items are in first-seen order. Variant ids are freshly synthesized.
pub fn parse(text: &str) -> Result<ParseOutcome, ParseError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(ParseError::Empty);
    }

    let mut items: Vec<InventoryItem> = Vec::new();
    let mut index_by_sku: HashMap<String, usize> = HashMap::new();
    let mut skipped_rows = 0usize;

    // lines[0] is the header row.
    for line in &lines[1..] {
        let fields = split_delimited(line);
        if fields.len() < MIN_FIELDS {
            skipped_rows += 1;
            continue;
        }

        let sku = fields[0].trim().to_string();
        let title = fields[1].trim().to_string();
        if sku.is_empty() || title.is_empty() {
            skipped_rows += 1;
            continue;
        }

        // The SIZE field may itself carry a delimiter-separated size list
        // (quoted in the source line); each size becomes its own variant
        // sharing the row's quantity, stock flag, and location.
        let sizes: Vec<&str> = fields[2]
            .split(DELIMITER)
            .map(str::trim)
            .filter(|size| !size.is_empty())
            .collect();
        if sizes.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let in_stock = parse_stock_flag(&fields[3]);
        let quantity = parse_quantity(&fields[4]);
        let location = fields[5].trim().to_string();
        let image_url = fields
            .get(6)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let index = match index_by_sku.get(&sku) {
            Some(&index) => index,
            None => {
                items.push(InventoryItem {
                    id: Uuid::new_v4().to_string(),
                    sku: sku.clone(),
                    title,
                    image_url,
                    variants: Vec::new(),
                    custom_fields: Default::default(),
                });
                index_by_sku.insert(sku, items.len() - 1);
                items.len() - 1
            }
        };
        for size in sizes {
            items[index].variants.push(SizeVariant::with_stock_flag(
                size,
                quantity,
                in_stock,
                location.clone(),
            ));
        }
    }

    if items.is_empty() {
        return Err(ParseError::NoValidData);
    }
    Ok(ParseOutcome {
        items,
        skipped_rows,
    })
}

/// Serialize items to delimited text: the header row followed by one row per
/// `(item, variant)` pair. Values are written unquoted.
pub fn serialize(items: &[InventoryItem]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for item in items {
        for variant in &item.variants {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                item.sku,
                item.title,
                variant.size,
                variant.in_stock,
                variant.quantity,
                variant.location,
                item.image_url.as_deref().unwrap_or(""),
            ));
        }
    }
    out
}

/// Date-stamped export file name, e.g. `inventory_export_2026-08-23.csv`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("inventory_export_{}{}", date.format("%Y-%m-%d"), FILE_EXTENSION)
}

/// Whether a picked file is acceptable for import, by extension or declared
/// content type.
pub fn is_importable(file_name: &str, content_type: Option<&str>) -> bool {
    if file_name.to_ascii_lowercase().ends_with(FILE_EXTENSION) {
        return true;
    }
    content_type
        .map(|declared| {
            IMPORT_CONTENT_TYPES
                .iter()
                .any(|accepted| declared.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_splits_outside_quotes_only() {
        assert_eq!(
            split_delimited(r#"A1,Shirt,"M,L",true,10,R1,"#),
            vec!["A1", "Shirt", "M,L", "true", "10", "R1", ""]
        );
        assert_eq!(split_delimited("a,b"), vec!["a", "b"]);
        assert_eq!(split_delimited(""), vec![""]);
    }

    #[test]
    fn rows_sharing_a_sku_merge_into_one_item() {
        let text = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
                    A1,Shirt,\"M,L\",true,10,R1,\n\
                    A1,Shirt,XL,false,0,R2,\n";
        let outcome = parse(text).expect("parse");
        assert_eq!(outcome.skipped_rows, 0);
        assert_eq!(outcome.items.len(), 1);

        let item = &outcome.items[0];
        assert_eq!(item.sku, "A1");
        assert_eq!(item.title, "Shirt");
        let got: Vec<(&str, u32, &str, bool)> = item
            .variants
            .iter()
            .map(|v| (v.size.as_str(), v.quantity, v.location.as_str(), v.in_stock))
            .collect();
        assert_eq!(
            got,
            vec![
                ("M", 10, "R1", true),
                ("L", 10, "R1", true),
                ("XL", 0, "R2", false),
            ]
        );
    }

    #[test]
    fn items_keep_first_seen_order() {
        let text = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
                    B2,Hat,OS,1,2,R3,\n\
                    A1,Shirt,M,true,10,R1,\n\
                    B2,Hat,Youth,0,0,R3,\n";
        let outcome = parse(text).expect("parse");
        let skus: Vec<&str> = outcome.items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["B2", "A1"]);
        assert_eq!(outcome.items[0].variants.len(), 2);
    }

    #[test]
    fn short_rows_are_skipped_and_counted() {
        let text = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
                    A1,Shirt,M,true\n\
                    A1,Shirt,M,true,10,R1,\n";
        let outcome = parse(text).expect("parse");
        assert_eq!(outcome.skipped_rows, 1);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].variants.len(), 1);
    }

    #[test]
    fn lenient_flag_and_quantity_parsing() {
        let text = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
                    A1,Shirt,M,TRUE,abc,R1,\n\
                    A1,Shirt,L,0,7,R1,\n";
        let outcome = parse(text).expect("parse");
        let variants = &outcome.items[0].variants;
        assert!(variants[0].in_stock);
        assert_eq!(variants[0].quantity, 0);
        assert!(!variants[1].in_stock);
        assert_eq!(variants[1].quantity, 7);
    }

    #[test]
    fn empty_and_unusable_files_are_rejected() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(
            parse("SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n"),
            Err(ParseError::Empty)
        );
        assert_eq!(
            parse("SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\nA1,Shirt\n"),
            Err(ParseError::NoValidData)
        );
    }

    #[test]
    fn export_then_import_round_trips_variant_tuples() {
        let text = "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
                    A1,Shirt,\"M,L\",true,10,R1,http://img/a1\n\
                    A1,Shirt,XL,false,0,R2,\n\
                    B2,Hat,OS,true,3,R9,\n";
        let first = parse(text).expect("first parse");
        let exported = serialize(&first.items);
        let second = parse(&exported).expect("reparse");

        let tuples = |items: &[InventoryItem]| -> Vec<(String, String, u32, String, bool)> {
            items
                .iter()
                .flat_map(|item| {
                    item.variants.iter().map(|v| {
                        (
                            item.sku.clone(),
                            v.size.clone(),
                            v.quantity,
                            v.location.clone(),
                            v.in_stock,
                        )
                    })
                })
                .collect()
        };
        assert_eq!(tuples(&first.items), tuples(&second.items));
        assert_eq!(second.items[0].image_url.as_deref(), Some("http://img/a1"));
    }

    #[test]
    fn export_writes_header_first_and_one_row_per_variant() {
        let outcome = parse(
            "SKU,TITLE,SIZE,IN STOCK,QUANTITY,LOCATION,IMAGE_URL\n\
             A1,Shirt,\"M,L\",true,10,R1,\n",
        )
        .expect("parse");
        let exported = serialize(&outcome.items);
        let lines: Vec<&str> = exported.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "A1,Shirt,M,true,10,R1,");
    }

    #[test]
    fn export_file_name_is_date_stamped() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_eq!(export_file_name(date), "inventory_export_2026-08-23.csv");
    }

    #[test]
    fn import_acceptance_by_extension_or_content_type() {
        assert!(is_importable("Stock.CSV", None));
        assert!(is_importable("stock.txt", Some("text/csv")));
        assert!(!is_importable("stock.txt", Some("text/plain")));
        assert!(!is_importable("stock.txt", None));
    }
}
