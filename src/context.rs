use std::fs;
use std::path::{Path, PathBuf};

/// Node name prefixes V4L2 drivers register under /dev
pub const NODE_PREFIXES: [&str; 4] = ["video", "vout", "vbi", "radio"];

/// A device node that looks like it belongs to a V4L2 driver
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
    path: PathBuf,
}

impl Node {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Node {
            path: PathBuf::from(path.as_ref()),
        }
    }

    /// Returns the absolute path of the device node
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the index of the device node, e.g. 2 for /dev/video2
    pub fn index(&self) -> Option<usize> {
        let file_name = self.path.file_name()?.to_str()?;
        let digits = file_name.len() - file_name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        file_name[file_name.len() - digits..].parse().ok()
    }

    /// Returns name of the device by parsing its sysfs entry
    pub fn name(&self) -> Option<String> {
        let file_name = self.path.file_name()?.to_str()?;
        let name = fs::read_to_string(format!("/sys/class/video4linux/{}/name", file_name));
        name.ok().map(|name| name.trim().to_string())
    }
}

/// Whether a /dev entry name is one of the V4L2 node kinds
pub fn is_candidate(file_name: &str) -> bool {
    NODE_PREFIXES.iter().any(|prefix| {
        file_name
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Returns a sorted list of candidate devices currently known to the system
///
/// # Example
///
/// ```no_run
/// use v4l2ucp::context;
/// for dev in context::enum_devices() {
///     println!("{}: {}", dev.path().display(), dev.name().unwrap_or_default());
/// }
/// ```
pub fn enum_devices() -> Vec<Node> {
    enum_devices_in("/dev")
}

fn enum_devices_in<P: AsRef<Path>>(dir: P) -> Vec<Node> {
    let mut devices = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot list device nodes: {}", e);
            return devices;
        }
    };

    for dentry in entries.flatten() {
        let file_name = dentry.file_name();
        if file_name.to_str().map_or(false, is_candidate) {
            devices.push(Node::new(dentry.path()));
        }
    }

    devices.sort();
    devices
}
