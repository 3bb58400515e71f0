//! Terminal list loading and time zone resolution.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rollcall_core::{Location, Terminal};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tzf_rs::DefaultFinder;

static ZONE_FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// Terminals keyed by title.
#[derive(Debug, Clone, Default)]
pub struct TerminalDirectory {
    by_title: BTreeMap<String, Terminal>,
}

impl TerminalDirectory {
    /// Load and merge the JSON terminal lists at `paths`, in order.
    ///
    /// Every terminal gets a time zone; one the list leaves out is looked up
    /// from its coordinates.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut directory = Self::default();
        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read terminals {}", path.display()))?;
            let terminals: Vec<Terminal> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid terminal list {}", path.display()))?;
            log::debug!("Loaded {} terminals from {}", terminals.len(), path.display());

            let terminals = terminals
                .into_iter()
                .map(with_timezone)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Bad terminal in {}", path.display()))?;
            directory.extend(terminals);
        }
        Ok(directory)
    }

    /// Add terminals; a repeated title replaces the earlier entry.
    pub fn extend(&mut self, terminals: impl IntoIterator<Item = Terminal>) {
        for terminal in terminals {
            if let Some(previous) = self.by_title.insert(terminal.title.clone(), terminal) {
                log::warn!("Duplicate terminal '{}', keeping the later entry", previous.title);
            }
        }
    }

    pub fn get(&self, title: &str) -> Option<&Terminal> {
        self.by_title.get(title)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

/// Fill in `terminal.timezone`, checking any name already given.
fn with_timezone(mut terminal: Terminal) -> Result<Terminal> {
    let name = match terminal.timezone.take() {
        Some(name) => name,
        None => lookup_zone_name(terminal.location)
            .with_context(|| format!("No time zone for terminal '{}'", terminal.title))?,
    };
    parse_zone(&name).with_context(|| format!("Terminal '{}'", terminal.title))?;
    terminal.timezone = Some(name);
    Ok(terminal)
}

/// IANA zone name at `location`.
pub fn lookup_zone_name(location: Location) -> Result<String> {
    let Location {
        latitude,
        longitude,
    } = location;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        bail!("Coordinates ({}, {}) are out of range", latitude, longitude);
    }

    let name = ZONE_FINDER.get_tz_name(longitude, latitude);
    if name.is_empty() {
        bail!("No time zone at ({}, {})", latitude, longitude);
    }
    log::debug!("Time zone at ({}, {}) is {}", latitude, longitude, name);
    Ok(name.to_string())
}

pub fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("Unknown time zone '{}': {}", name, e))
}

/// `reference` as the wall-clock time at the terminal, so month candidates
/// follow the date printed on the local board.
pub fn local_reference(reference: DateTime<Utc>, zone: Tz) -> DateTime<Utc> {
    reference.with_timezone(&zone).naive_local().and_utc()
}
