//! Модуль для работы с FFprobe
//!
//! Генератор таймингов знает только длительность аудио, ее дает ffprobe.

use std::path::Path;
use std::process::Command;
use crate::error::{KaraokeError, Result};

/// Источник длительности аудиофайла
pub trait DurationProbe: Send + Sync {
    /// Длительность файла в миллисекундах
    fn duration_ms(&self, path: &Path) -> Result<u64>;
}

/// Длительность через установленный в системе ffprobe
#[derive(Debug, Clone, Default)]
pub struct FfprobeDuration;

impl DurationProbe for FfprobeDuration {
    fn duration_ms(&self, path: &Path) -> Result<u64> {
        probe_duration_ms(path)
    }
}

/// Проверка наличия FFprobe
pub fn check_ffprobe_installed() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Запуск команды FFprobe
pub fn run_ffprobe_command(args: &[&str]) -> Result<String> {
    let output = Command::new("ffprobe").args(args).output()?;

    if !output.status.success() {
        return Err(KaraokeError::Other(format!(
            "FFprobe command failed with status: {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Длительность аудиофайла в миллисекундах
pub fn probe_duration_ms(path: &Path) -> Result<u64> {
    if !path.is_file() {
        return Err(KaraokeError::InvalidInput(format!(
            "Audio file not found: {}",
            path.display()
        )));
    }
    let path_str = path.to_string_lossy().to_string();
    let stdout = run_ffprobe_command(&[
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        path_str.as_str(),
    ])?;

    parse_seconds(&stdout)
        .or_else(|| parse_banner_duration(&stdout))
        .map(seconds_to_ms)
        .ok_or_else(|| {
            KaraokeError::Other(format!(
                "Could not read duration of {} from ffprobe output",
                path.display()
            ))
        })
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

/// Вывод вида `12.345000`
fn parse_seconds(output: &str) -> Option<f64> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
}

/// Строка баннера вида `Duration: 00:01:02.50, start: ...`
fn parse_banner_duration(output: &str) -> Option<f64> {
    let rest = output.split("Duration:").nth(1)?;
    let stamp = rest.split(',').next()?.trim();
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
