use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};

use landmass_world::{TerrainConfig, UpdatableSettings, load_config_from_path};

/// Watches the directory holding the terrain config on a background thread and
/// sends one `()` per event that touches the config file. Watching the directory
/// keeps working when editors save by renaming a temp file over the original.
pub fn spawn_config_watcher(path: PathBuf) -> Receiver<()> {
    let (tx, rx) = channel::<()>();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name().map(|n| n.to_os_string());
    std::thread::spawn(move || {
        use notify::{EventKind, RecursiveMode, Watcher};
        match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if !touches_file(&event, file_name.as_deref()) {
                    return;
                }
                match event.kind {
                    EventKind::Modify(_)
                    | EventKind::Create(_)
                    | EventKind::Remove(_)
                    | EventKind::Any => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        }) {
            Ok(mut watcher) => {
                if let Err(e) = watcher.watch(dir.as_path(), RecursiveMode::NonRecursive) {
                    log::warn!("cannot watch {}: {}", dir.display(), e);
                    return;
                }
                loop {
                    std::thread::sleep(std::time::Duration::from_secs(3600));
                }
            }
            Err(e) => log::warn!("config watcher unavailable: {}", e),
        }
    });
    rx
}

fn touches_file(event: &notify::Event, file_name: Option<&OsStr>) -> bool {
    let Some(name) = file_name else {
        return true;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

/// Reloads the config if any file events arrived. Listeners of `settings` see
/// the new value; a broken file leaves the current one in place.
pub fn process_config_events(
    rx: &Receiver<()>,
    path: &Path,
    settings: &mut UpdatableSettings<TerrainConfig>,
) -> bool {
    let mut changed = false;
    for _ in rx.try_iter() {
        changed = true;
    }
    if !changed {
        return false;
    }
    if !path.exists() {
        log::warn!("terrain config missing: {}", path.display());
        return false;
    }
    match load_config_from_path(path) {
        Ok(cfg) => {
            settings.set(cfg);
            log::info!("terrain config reloaded from {}", path.display());
            true
        }
        Err(e) => {
            log::warn!("terrain config reload failed ({}): {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind, ModifyKind, RenameMode};

    #[test]
    fn events_are_filtered_by_file_name() {
        let name = OsStr::new("terrain.toml");
        let saved = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(PathBuf::from("assets/.terrain.toml.swp"))
            .add_path(PathBuf::from("assets/terrain.toml"));
        assert!(touches_file(&saved, Some(name)));

        let other = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("assets/other.toml"));
        assert!(!touches_file(&other, Some(name)));
        assert!(touches_file(&other, None));
    }
}
