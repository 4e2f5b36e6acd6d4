// SPDX-License-Identifier: GPL-3.0-or-later

use calliope_domain::SourceClass;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

const STREAMING_SCHEMES: &[&str] = &["qobuz://", "tidal://", "spotify://"];
const LIBRARY_PREFIX: &str = "music-library/";

/// Filesystem types that mark a mount as network-backed.
const NETWORK_FSTYPES: &[&str] = &["cifs", "nfs", "smbfs", "fuse.sshfs", "fuse.rclone"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountEntry {
    mount_point: PathBuf,
    fstype: String,
}

/// Classifies catalog URIs by provenance. The mount table is loaded on
/// first use and cached until [`refresh`](Self::refresh) clears it.
#[derive(Debug)]
pub struct SourceResolver {
    music_root: PathBuf,
    mounts_path: PathBuf,
    mounts: RwLock<Option<Arc<Vec<MountEntry>>>>,
}

impl SourceResolver {
    pub fn new(music_root: impl Into<PathBuf>, mounts_path: impl Into<PathBuf>) -> Self {
        Self {
            music_root: music_root.into(),
            mounts_path: mounts_path.into(),
            mounts: RwLock::new(None),
        }
    }

    /// Map a URI to its source class. Deterministic for a given cached
    /// mount table.
    pub fn classify(&self, uri: &str) -> SourceClass {
        if STREAMING_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            return SourceClass::Streaming;
        }

        let residue = uri.strip_prefix(LIBRARY_PREFIX).unwrap_or(uri);

        if residue.starts_with("NAS/") {
            return SourceClass::Nas;
        }
        if residue.starts_with("USB/") {
            return SourceClass::Usb;
        }
        if residue.starts_with("INTERNAL/") {
            return SourceClass::Local;
        }

        self.classify_by_mount(residue)
    }

    pub fn is_local_source(&self, uri: &str) -> bool {
        self.classify(uri).is_local()
    }

    /// Split a URI list into per-class buckets.
    pub fn partition_by_class(&self, uris: &[String]) -> Vec<(SourceClass, Vec<String>)> {
        let mut buckets: Vec<(SourceClass, Vec<String>)> = Vec::new();
        for uri in uris {
            let class = self.classify(uri);
            match buckets.iter_mut().find(|(c, _)| *c == class) {
                Some((_, bucket)) => bucket.push(uri.clone()),
                None => buckets.push((class, vec![uri.clone()])),
            }
        }
        buckets
    }

    /// Keep only local-source URIs; also reports how many were dropped.
    pub fn filter_local(&self, uris: &[String]) -> (Vec<String>, usize) {
        let kept: Vec<String> = uris
            .iter()
            .filter(|uri| self.is_local_source(uri))
            .cloned()
            .collect();
        let dropped = uris.len() - kept.len();
        (kept, dropped)
    }

    /// Drop the cached mount table; the next classification reloads it.
    /// Call when the host's mount topology is known to have changed.
    pub fn refresh(&self) {
        let mut guard = self.mounts.write().expect("mount cache lock poisoned");
        *guard = None;
        debug!(target: "classifier", "mount table cache cleared");
    }

    fn classify_by_mount(&self, residue: &str) -> SourceClass {
        let absolute = self.music_root.join(residue);
        let mounts = self.mount_table();

        // Longest containing mount point wins.
        let best = mounts
            .iter()
            .filter(|entry| absolute.starts_with(&entry.mount_point))
            .max_by_key(|entry| entry.mount_point.as_os_str().len());

        match best {
            Some(entry) if NETWORK_FSTYPES.contains(&entry.fstype.as_str()) => SourceClass::Mounted,
            _ => SourceClass::Local,
        }
    }

    fn mount_table(&self) -> Arc<Vec<MountEntry>> {
        if let Some(cached) = self.mounts.read().expect("mount cache lock poisoned").clone() {
            return cached;
        }

        let mut guard = self.mounts.write().expect("mount cache lock poisoned");
        // Another thread may have loaded it while we waited for the lock.
        if let Some(cached) = guard.clone() {
            return cached;
        }

        let loaded = Arc::new(self.load_mounts());
        *guard = Some(loaded.clone());
        loaded
    }

    fn load_mounts(&self) -> Vec<MountEntry> {
        match std::fs::read_to_string(&self.mounts_path) {
            Ok(contents) => {
                let entries = parse_mounts(&contents);
                debug!(
                    target: "classifier",
                    path = %self.mounts_path.display(),
                    entries = entries.len(),
                    "mount table loaded"
                );
                entries
            }
            Err(error) => {
                warn!(
                    target: "classifier",
                    path = %self.mounts_path.display(),
                    %error,
                    "mount table unreadable; treating unprefixed paths as local"
                );
                Vec::new()
            }
        }
    }
}

/// Parse /proc/self/mounts lines: `device mountpoint fstype options 0 0`.
/// Octal escapes in mount points (spaces are `\040`) are decoded.
fn parse_mounts(contents: &str) -> Vec<MountEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = fields.next()?;
            let fstype = fields.next()?;
            Some(MountEntry {
                mount_point: PathBuf::from(decode_mount_path(mount_point)),
                fstype: fstype.to_string(),
            })
        })
        .collect()
}

fn decode_mount_path(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let octal: String = chars.by_ref().take(3).collect();
            if octal.len() == 3 {
                if let Ok(code) = u8::from_str_radix(&octal, 8) {
                    decoded.push(code as char);
                    continue;
                }
            }
            decoded.push('\\');
            decoded.push_str(&octal);
        } else {
            decoded.push(c);
        }
    }
    decoded
}

impl SourceResolver {
    /// Resolver with a music root only; uses the host's real mount table.
    pub fn for_music_root(music_root: impl Into<PathBuf>) -> Self {
        Self::new(music_root, Path::new("/proc/self/mounts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn resolver_with_mounts(mounts: &str) -> (SourceResolver, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().expect("temp mounts");
        write!(file, "{}", mounts).expect("write mounts");
        let resolver = SourceResolver::new("/music", file.path());
        (resolver, file)
    }

    #[test]
    fn test_streaming_schemes() {
        let (resolver, _file) = resolver_with_mounts("");
        assert_eq!(resolver.classify("qobuz://album/12345"), SourceClass::Streaming);
        assert_eq!(resolver.classify("tidal://track/9"), SourceClass::Streaming);
        assert_eq!(resolver.classify("spotify://playlist/1"), SourceClass::Streaming);
    }

    #[test]
    fn test_prefix_rules_with_and_without_library_segment() {
        let (resolver, _file) = resolver_with_mounts("");
        assert_eq!(
            resolver.classify("music-library/NAS/Share/a.flac"),
            SourceClass::Nas
        );
        assert_eq!(resolver.classify("NAS/Share/a.flac"), SourceClass::Nas);
        assert_eq!(resolver.classify("USB/Drive/Album/t.mp3"), SourceClass::Usb);
        assert_eq!(
            resolver.classify("music-library/INTERNAL/x.flac"),
            SourceClass::Local
        );
    }

    #[test]
    fn test_local_source_predicate_matches_class() {
        let (resolver, _file) = resolver_with_mounts("");
        for uri in ["USB/Drive/t.mp3", "INTERNAL/t.mp3", "NAS/t.mp3", "qobuz://x"] {
            assert_eq!(
                resolver.is_local_source(uri),
                resolver.classify(uri).is_local(),
                "predicate must agree with classify for {}",
                uri
            );
        }
        assert!(resolver.is_local_source("USB/Drive/Album/t.mp3"));
    }

    #[test]
    fn test_mount_table_classification() {
        let (resolver, _file) = resolver_with_mounts(
            "sysfs /sys sysfs rw 0 0\n\
             /dev/sda1 / ext4 rw 0 0\n\
             //nas/share /music/shares cifs rw 0 0\n",
        );
        // /music/shares is the longest containing mount and is cifs
        assert_eq!(resolver.classify("shares/album/t.flac"), SourceClass::Mounted);
        // / is the longest containing mount for everything else
        assert_eq!(resolver.classify("ripped/album/t.flac"), SourceClass::Local);
    }

    #[test]
    fn test_longest_mount_point_wins() {
        let (resolver, _file) = resolver_with_mounts(
            "/dev/sda1 / ext4 rw 0 0\n\
             remote /music nfs rw 0 0\n\
             /dev/sdb1 /music/fast ext4 rw 0 0\n",
        );
        assert_eq!(resolver.classify("slow/t.flac"), SourceClass::Mounted);
        assert_eq!(resolver.classify("fast/t.flac"), SourceClass::Local);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let (resolver, _file) = resolver_with_mounts("/dev/sda1 / ext4 rw 0 0\n");
        for uri in ["a/b.flac", "NAS/x.flac", "qobuz://y"] {
            assert_eq!(resolver.classify(uri), resolver.classify(uri));
        }
    }

    #[test]
    fn test_refresh_reloads_mount_table() {
        let mut file = tempfile::NamedTempFile::new().expect("temp mounts");
        writeln!(file, "/dev/sda1 / ext4 rw 0 0").expect("write");
        let resolver = SourceResolver::new("/music", file.path());
        assert_eq!(resolver.classify("x/t.flac"), SourceClass::Local);

        writeln!(file, "remote /music nfs rw 0 0").expect("append");
        file.flush().expect("flush");
        // Cached table still answers until refreshed
        assert_eq!(resolver.classify("x/t.flac"), SourceClass::Local);
        resolver.refresh();
        assert_eq!(resolver.classify("x/t.flac"), SourceClass::Mounted);
    }

    #[test]
    fn test_filter_local() {
        let (resolver, _file) = resolver_with_mounts("");
        let uris: Vec<String> = ["INTERNAL/a", "NAS/b", "qobuz://c", "USB/d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (kept, dropped) = resolver.filter_local(&uris);
        assert_eq!(kept, vec!["INTERNAL/a".to_string(), "USB/d".to_string()]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_partition_by_class() {
        let (resolver, _file) = resolver_with_mounts("");
        let uris: Vec<String> = ["INTERNAL/a", "NAS/b", "NAS/c", "tidal://d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let buckets = resolver.partition_by_class(&uris);
        let nas = buckets
            .iter()
            .find(|(c, _)| *c == SourceClass::Nas)
            .map(|(_, b)| b.len());
        assert_eq!(nas, Some(2));
        assert_eq!(buckets.iter().map(|(_, b)| b.len()).sum::<usize>(), 4);
    }

    #[test]
    fn test_decode_mount_path_octal_escapes() {
        assert_eq!(decode_mount_path("/mnt/my\\040nas"), "/mnt/my nas");
        assert_eq!(decode_mount_path("/plain"), "/plain");
    }

    #[test]
    fn test_missing_mounts_file_defaults_to_local() {
        let resolver = SourceResolver::new("/music", "/nonexistent/mounts");
        assert_eq!(resolver.classify("anything/t.flac"), SourceClass::Local);
    }
}
