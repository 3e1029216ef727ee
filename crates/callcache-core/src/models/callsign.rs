use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ham radio operator's entry from the call-sign dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsignEntry {
    pub call_sign: String,
    pub first_name: String,
    pub last_name: String,
}

impl CallsignEntry {
    pub fn new(call_sign: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            call_sign: normalize_call_sign(call_sign),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    /// Name in "Last, First" format
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Result of a call-sign lookup, with the display name already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsignLookupResult {
    pub call_sign: String,
    pub first_name: String,
    pub last_name: String,
    /// "lastName, firstName"
    pub full_name: String,
}

impl From<CallsignEntry> for CallsignLookupResult {
    fn from(entry: CallsignEntry) -> Self {
        let full_name = entry.full_name();
        Self {
            call_sign: entry.call_sign,
            first_name: entry.first_name,
            last_name: entry.last_name,
            full_name,
        }
    }
}

/// Canonical form used for keys and the ordered index.
pub fn normalize_call_sign(call_sign: &str) -> String {
    call_sign.trim().to_uppercase()
}

/// Persisted flag recording that a full dataset load committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationMarker {
    pub loaded: bool,
    pub loaded_at: DateTime<Utc>,
    #[serde(default)]
    pub record_count: usize,
}

impl PopulationMarker {
    pub fn loaded(record_count: usize) -> Self {
        Self {
            loaded: true,
            loaded_at: Utc::now(),
            record_count,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.loaded_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// Human-readable age such as "5m ago", rounded to the nearest hour or day.
fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Snapshot of what the local cache currently holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub record_count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CacheStatus {
    pub fn age_display(&self) -> String {
        match self.loaded_at {
            Some(loaded_at) => format_age((Utc::now() - loaded_at).num_minutes()),
            None => "never".to_string(),
        }
    }
}
