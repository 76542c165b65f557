use std::path::Path;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use retailsense_core::domain::event::RawEvent;

use super::CommandResult;

const CATEGORIES: &[&str] = &["Electronics", "Audio", "Accessories", "Wearables", "Computing"];
const BRANDS: &[&str] = &["TechCorp", "AudioPro", "SmartDevices", "EliteGear", "NextGen"];
const NAME_PREFIXES: &[&str] = &["Premium", "Pro", "Smart", "Wireless", "Digital", "Ultra"];
const NAME_NOUNS: &[&str] =
    &["Headphones", "Speaker", "Mouse", "Keyboard", "Monitor", "Watch", "Camera", "Charger"];
const COUNTRIES: &[&str] = &["US", "GB", "DE", "IN", "BR"];
const DEVICES: &[&str] = &["mobile", "desktop", "tablet"];

/// Writes a deterministic JSONL event feed covering the default analysis
/// window. The same arguments always produce byte-identical output, so
/// repeated offline runs stay reproducible.
pub fn run(path: &Path, products: u32) -> CommandResult {
    let mut lines = Vec::new();
    for product_index in 0..products {
        append_product_events(&mut lines, product_index);
    }

    let event_count = lines.len();
    let feed = lines.join("\n") + "\n";

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                return CommandResult::failure(
                    "seed",
                    "io",
                    format!("could not create `{}`: {error}", parent.display()),
                    3,
                );
            }
        }
    }
    if let Err(error) = std::fs::write(path, feed) {
        return CommandResult::failure(
            "seed",
            "io",
            format!("could not write `{}`: {error}", path.display()),
            3,
        );
    }

    CommandResult::success(
        "seed",
        format!("wrote {event_count} events for {products} products to `{}`", path.display()),
    )
}

fn append_product_events(lines: &mut Vec<String>, product_index: u32) {
    let i = product_index as usize;
    let sku = format!("PROD_{:03}", product_index + 1);
    let name = format!(
        "{} {} {}",
        NAME_PREFIXES[i % NAME_PREFIXES.len()],
        NAME_NOUNS[i % NAME_NOUNS.len()],
        product_index + 1
    );
    let category = CATEGORIES[i % CATEGORIES.len()];
    let brand = BRANDS[i % BRANDS.len()];
    let price_cents = 2_000 + (i as i64 * 997) % 48_000;
    let price = Decimal::new(price_cents, 2);

    let views = 6 + i as u32 % 15;
    let cart_adds = 1 + i as u32 % 5;
    let checkouts = i as u32 % 3;
    let purchases = i as u32 % 4;

    let mut push = |event_name: &str, occurrence: u32, revenue: Option<Decimal>| {
        let row = RawEvent {
            product_sku: Some(sku.clone()),
            product_name: Some(name.clone()),
            category: Some(category.to_string()),
            brand: Some(brand.to_string()),
            price: Some(price),
            event_date: Some(event_date(product_index, occurrence)),
            user_id: Some(format!("user-{:03}", (i as u32 * 11 + occurrence * 5) % 120)),
            event_name: Some(event_name.to_string()),
            revenue,
            country: Some(COUNTRIES[(i + occurrence as usize) % COUNTRIES.len()].to_string()),
            device_category: Some(DEVICES[(i + occurrence as usize) % DEVICES.len()].to_string()),
        };
        if let Ok(line) = serde_json::to_string(&row) {
            lines.push(line);
        }
    };

    for occurrence in 0..views {
        push("view_item", occurrence, None);
    }
    for occurrence in 0..cart_adds {
        push("add_to_cart", occurrence, None);
    }
    for occurrence in 0..checkouts {
        push("begin_checkout", occurrence, None);
    }
    for occurrence in 0..purchases {
        // Revenue grows with each later purchase, giving trending products.
        let revenue = Decimal::new(price_cents * i64::from(occurrence + 1), 2);
        push("purchase", occurrence, Some(revenue));
    }
}

fn event_date(product_index: u32, occurrence: u32) -> String {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default();
    let offset = u64::from((product_index * 7 + occurrence * 3) % 89);
    start.checked_add_days(Days::new(offset)).unwrap_or(start).format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn seed_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first_path = dir.path().join("first.jsonl");
        let second_path = dir.path().join("second.jsonl");

        let first = run(&first_path, 10);
        let second = run(&second_path, 10);
        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);

        let first_feed = std::fs::read_to_string(&first_path).expect("read first");
        let second_feed = std::fs::read_to_string(&second_path).expect("read second");
        assert_eq!(first_feed, second_feed);
        assert!(first_feed.lines().count() > 10 * 7);
    }

    #[test]
    fn seed_rows_parse_as_raw_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        run(&path, 5);

        let feed = std::fs::read_to_string(&path).expect("read feed");
        for line in feed.lines() {
            let row: retailsense_core::domain::event::RawEvent =
                serde_json::from_str(line).expect("row parses");
            assert!(row.product_sku.is_some());
        }
    }
}
