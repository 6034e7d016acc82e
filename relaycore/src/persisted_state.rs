//! Server-id and pid-file persistence. The server-id file sits next to
//! the pid file with the same stem and a `.id` suffix: read it back if
//! present, otherwise generate a fresh `vid-XXXXXXX` id — and always
//! write the chosen value back, so a fresh pid file with a stale id file
//! next to it still converges on one value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ID_ALPHABET: [char; 62] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x',
    'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V',
    'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

#[must_use]
pub fn server_id_path(pid_path: &Path) -> PathBuf {
    pid_path.with_extension("id")
}

fn generate_server_id() -> String {
    format!("vid-{}", nanoid::nanoid!(7, &ID_ALPHABET))
}

/// Reads the server id from `id_path` if present and non-empty;
/// otherwise generates one. Either way, writes the chosen value back to
/// `id_path`.
pub fn load_or_create_server_id(id_path: &Path) -> io::Result<String> {
    let existing = fs::read_to_string(id_path).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let id = existing.unwrap_or_else(generate_server_id);
    fs::write(id_path, &id)?;
    Ok(id)
}

pub fn write_pid_file(pid_path: &Path) -> io::Result<()> {
    fs::write(pid_path, std::process::id().to_string())
}

pub fn remove_pid_file(pid_path: &Path) {
    if let Err(err) = fs::remove_file(pid_path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %pid_path.display(), error = %err, "failed to remove pid file on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_match_the_documented_shape() {
        let id = generate_server_id();
        assert!(id.starts_with("vid-"));
        let suffix = &id[4..];
        assert_eq!(suffix.len(), 7);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn a_missing_id_file_is_created_and_then_read_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let id_path = dir.path().join("relaycore.id");

        let first = load_or_create_server_id(&id_path).unwrap();
        let second = load_or_create_server_id(&id_path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn server_id_path_shares_the_pid_files_stem() {
        let pid = Path::new("/var/run/relaycore.pid");
        assert_eq!(server_id_path(pid), PathBuf::from("/var/run/relaycore.id"));
    }

    #[test]
    fn pid_file_round_trips_the_current_process_id() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("relaycore.pid");
        write_pid_file(&pid_path).unwrap();
        let contents = fs::read_to_string(&pid_path).unwrap();
        assert_eq!(contents.parse::<u32>().unwrap(), std::process::id());
        remove_pid_file(&pid_path);
        assert!(!pid_path.exists());
    }
}
