//! Swapping an executable in place with a `.bak` safety copy.
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use super::UpdateError;

/// `<target>.bak`
pub fn backup_path(target: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{target}.bak"))
}

/// Move `source` onto `target`, copying when a rename is impossible (other filesystem).
fn move_file(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!("rename {source} -> {target} failed ({err}), copying instead");
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}

/// Replace `target` by `new_file`.
///
/// Arguments
/// -----------------
/// * `new_file` – Freshly downloaded executable; consumed on success.
/// * `target` – Executable to replace. It may not exist yet.
///
/// Return
/// ----------
/// * `Ok(())` once `target` holds the new executable (mode `0755` on Unix). The previous
///   executable is left at [`backup_path`].
/// * [`UpdateError::Replace`] otherwise; the previous executable is restored first.
pub fn replace_executable(new_file: &Utf8Path, target: &Utf8Path) -> Result<(), UpdateError> {
    replace_with(new_file, target, |new_file, target| {
        move_file(new_file, target)?;
        make_executable(target)
    })
}

/// Backup, `install`, and restore the backup if `install` fails at any point.
fn replace_with(
    new_file: &Utf8Path,
    target: &Utf8Path,
    install: impl Fn(&Utf8Path, &Utf8Path) -> io::Result<()>,
) -> Result<(), UpdateError> {
    if !new_file.is_file() {
        return Err(UpdateError::Replace {
            target: target.to_path_buf(),
            reason: format!("{new_file} is not a file"),
        });
    }

    let backup = backup_path(target);
    let had_previous = target.exists();
    if had_previous {
        if backup.exists() {
            let _ = fs::remove_file(&backup);
        }
        move_file(target, &backup).map_err(|err| UpdateError::Replace {
            target: target.to_path_buf(),
            reason: format!("cannot back up to {backup}: {err}"),
        })?;
    }

    install(new_file, target).map_err(|err| {
        if had_previous {
            if let Err(restore_err) = move_file(&backup, target) {
                warn!("restoring {target} from {backup} failed: {restore_err}");
            }
        }
        UpdateError::Replace {
            target: target.to_path_buf(),
            reason: format!("cannot install {new_file}: {err}"),
        }
    })
}

#[cfg(test)]
mod replace_tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
        (dir, root)
    }

    #[test]
    fn test_replace_keeps_backup() {
        let (_dir, root) = workspace();
        let target = root.join("afcs");
        let staged = root.join("afcs.new");
        fs::write(&target, "v1").unwrap();
        fs::write(&staged, "v2").unwrap();

        replace_executable(&staged, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "v2");
        assert_eq!(fs::read_to_string(backup_path(&target)).unwrap(), "v1");
        assert!(!staged.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_replace_without_previous_binary() {
        let (_dir, root) = workspace();
        let target = root.join("afcs");
        let staged = root.join("afcs.new");
        fs::write(&staged, "v2").unwrap();

        replace_executable(&staged, &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "v2");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn test_missing_new_file_leaves_target_untouched() {
        let (_dir, root) = workspace();
        let target = root.join("afcs");
        fs::write(&target, "v1").unwrap();

        let err = replace_executable(&root.join("absent.new"), &target).unwrap_err();
        assert!(matches!(err, UpdateError::Replace { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "v1");
    }

    #[test]
    fn test_failed_install_restores_previous_binary() {
        let (_dir, root) = workspace();
        let target = root.join("afcs");
        let staged = root.join("afcs.new");
        fs::write(&target, "v1").unwrap();
        fs::write(&staged, "v2").unwrap();

        let err = replace_with(&staged, &target, |_, _| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        })
        .unwrap_err();

        assert!(matches!(err, UpdateError::Replace { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "v1");
        assert!(!backup_path(&target).exists());
        assert!(staged.exists());
    }

    #[test]
    fn test_failure_after_move_restores_previous_binary() {
        let (_dir, root) = workspace();
        let target = root.join("afcs");
        let staged = root.join("afcs.new");
        fs::write(&target, "v1").unwrap();
        fs::write(&staged, "v2").unwrap();

        // the new file is in place when the permission change fails
        let err = replace_with(&staged, &target, |new_file, target| {
            move_file(new_file, target)?;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "chmod"))
        })
        .unwrap_err();

        assert!(matches!(err, UpdateError::Replace { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "v1");
        assert!(!backup_path(&target).exists());
    }
}
