use std::path::PathBuf;

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ondas")
}

pub fn data_dir() -> PathBuf {
    // Keep data under the XDG data dir on every platform for consistency.
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ondas")
}

/// Resolve the mpv binary: a bundled copy beside the executable wins over PATH.
pub fn find_mpv_binary() -> PathBuf {
    find_beside_exe("mpv").unwrap_or_else(|| PathBuf::from("mpv"))
}

/// Resolve the ffmpeg binary used for the analyser PCM tap.
pub fn find_ffmpeg_binary() -> PathBuf {
    find_beside_exe("ffmpeg").unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

fn find_beside_exe(name: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let candidate = if cfg!(windows) {
        dir.join(format!("{name}.exe"))
    } else {
        dir.join(name)
    };
    candidate.exists().then_some(candidate)
}

#[cfg(unix)]
pub fn player_socket_name() -> String {
    format!("{}/ondas-mpv.sock", std::env::temp_dir().display())
}

#[cfg(windows)]
pub fn player_socket_name() -> String {
    "ondas-mpv".to_string()
}

#[cfg(unix)]
pub fn player_socket_arg() -> String {
    format!("--input-ipc-server={}", player_socket_name())
}

#[cfg(windows)]
pub fn player_socket_arg() -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", player_socket_name())
}
