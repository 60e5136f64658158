//! Append-only output artifact.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};

use schemerge_core::NamingMode;

/// Metadata written at the top of every artifact.
#[derive(Debug, Clone)]
pub struct ArtifactHeader {
    pub generated_at: DateTime<Utc>,
    /// Redacted endpoint identities.
    pub source: String,
    pub target: String,
    pub naming: NamingMode,
    pub excluded: Vec<String>,
}

impl ArtifactHeader {
    pub fn render(&self) -> String {
        let excluded = if self.excluded.is_empty() {
            "(none)".to_string()
        } else {
            self.excluded.join(", ")
        };
        format!(
            "--\n\
             -- schemerge merge artifact\n\
             -- Generated at: {}\n\
             -- Source: {}\n\
             -- Target: {}\n\
             -- Naming mode: {}\n\
             -- Data from Target for: {excluded}\n\
             --\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.source,
            self.target,
            self.naming.as_str(),
        )
    }
}

/// Single-writer, append-only sink that counts what it wrote.
pub struct ArtifactWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> ArtifactWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub fn append(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())?;
        self.bytes = self.bytes.saturating_add(text.len() as u64);
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Flush and hand back the underlying sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn header_lists_endpoints_and_exclusions() {
        let header = ArtifactHeader {
            generated_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            source: "app@src:5432/crm".to_string(),
            target: "app@dst:5432/crm".to_string(),
            naming: NamingMode::ToSeparated,
            excluded: vec!["users".to_string(), "user_roles".to_string()],
        };
        let text = header.render();
        assert!(text.contains("-- Generated at: 2024-05-06T07:08:09Z\n"));
        assert!(text.contains("-- Source: app@src:5432/crm\n"));
        assert!(text.contains("-- Target: app@dst:5432/crm\n"));
        assert!(text.contains("-- Naming mode: to_separated\n"));
        assert!(text.contains("-- Data from Target for: users, user_roles\n"));
    }

    #[test]
    fn writer_appends_and_counts() {
        let mut writer = ArtifactWriter::new(Vec::new());
        writer.append("abc").unwrap();
        writer.append("de").unwrap();
        assert_eq!(writer.bytes_written(), 5);
        assert_eq!(writer.finish().unwrap(), b"abcde".to_vec());
    }
}
