//! Configuration loading: the base config and one wave file per interface.
//!
//! The base config lists the CAN interfaces to drive:
//! ```yaml
//! BaseConfig:
//!   - interfaceName: vcan0
//!     dbcFileName: vehicle.dbc
//!     customWaveFile: waves_vcan0.yaml
//! ```
//! Relative paths are resolved against the directory of the base config.
//!
//! Each wave file declares the global update period and the waveforms:
//! ```yaml
//! waveConfig:
//!   updateDuration:
//!     unit: ms
//!     duration: 10
//!   waveForms:
//!     - Set:
//!         Typ: single
//!         message:
//!           messageName: Engine
//!           messageSignals:
//!             - signalName: Rpm
//!               signalNoise: 0
//!               transformType: linear
//!               wave: { 0: 800, 100: 3000 }
//!     - Set:
//!         Typ: multi
//!         message:
//!           partsConfig:
//!             signalNoise: 0
//!             transformType: static
//!             wave: { 0: 1, 50: 0 }
//!           parts:
//!             - messageName: Lights
//!               messageSignals: [Left, Right]
//! ```
//! A `multi` set copies one waveform onto every listed (message, signal) pair.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::WaveformStore;
use crate::wave::{Keyframes, SignalWave, Transition};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Semantic problems found after the YAML itself parsed successfully.
///
/// All of them are fatal: the generator refuses to start.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("base configuration lists no interfaces")]
    NoInterfaces,

    #[error("interface '{0}' is listed more than once")]
    DuplicateInterface(String),

    #[error("unsupported updateDuration unit '{0}' (valid: us, ms, s)")]
    UnsupportedDurationUnit(String),

    #[error("updateDuration must be greater than zero")]
    ZeroDuration,

    /// Every wave file shares one global clock, so they must agree on its
    /// period.
    #[error("interface '{interface}' declares update period {found:?}, but {expected:?} was already configured")]
    ConflictingDuration {
        interface: String,
        expected: Duration,
        found: Duration,
    },

    #[error("signal '{signal}' in message '{message}' on '{interface}' has an empty wave")]
    EmptyWave {
        interface: String,
        message: String,
        signal: String,
    },

    #[error("signal '{signal}' in message '{message}' on '{interface}' is declared more than once")]
    DuplicateSignal {
        interface: String,
        message: String,
        signal: String,
    },
}

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BaseConfigFile {
    #[serde(rename = "BaseConfig", default)]
    interfaces: Vec<InterfaceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterfaceEntry {
    interface_name: String,
    dbc_file_name: PathBuf,
    custom_wave_file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveFileRaw {
    wave_config: WaveConfigSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveConfigSection {
    update_duration: UpdateDuration,
    #[serde(default)]
    wave_forms: Vec<WaveSetEntry>,
}

#[derive(Debug, Deserialize)]
struct UpdateDuration {
    unit: String,
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct WaveSetEntry {
    #[serde(rename = "Set")]
    set: WaveSet,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "Typ", rename_all = "lowercase")]
enum WaveSet {
    Single { message: SingleMessage },
    Multi { message: MultiMessage },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleMessage {
    message_name: String,
    #[serde(default)]
    message_signals: Vec<SignalEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalEntry {
    signal_name: String,
    #[serde(flatten)]
    shape: WaveShape,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiMessage {
    parts_config: WaveShape,
    #[serde(default)]
    parts: Vec<PartEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartEntry {
    message_name: String,
    #[serde(default)]
    message_signals: Vec<String>,
}

/// The waveform half of a signal declaration, shared by `single` signals and
/// `multi` parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveShape {
    #[serde(default)]
    signal_noise: i32,
    transform_type: Transition,
    /// Value held until the first keyframe.  Defaults to `0.0`.
    #[serde(default)]
    initial_value: f64,
    #[serde(default)]
    wave: Keyframes,
}

impl WaveShape {
    fn to_wave(&self) -> SignalWave {
        SignalWave::new(
            self.wave.clone(),
            self.transform_type,
            self.signal_noise,
            self.initial_value,
        )
    }
}

// ── Public data structures ────────────────────────────────────────────────────

/// One interface from the base config, with paths already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceConfig {
    pub name: String,
    pub dbc_path: PathBuf,
    pub wave_path: PathBuf,
}

/// One configured signal, flattened out of `single` / `multi` sets.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDeclaration {
    pub message: String,
    pub signal: String,
    pub wave: SignalWave,
}

/// Parsed content of one wave file.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveFile {
    /// Global update period declared by this file.
    pub period: Duration,
    /// Signals in declaration order.
    pub declarations: Vec<SignalDeclaration>,
}

/// Everything the generator needs before the first tick.
#[derive(Debug)]
pub struct SimulationConfig {
    /// Period of the global tick.
    pub period: Duration,
    pub interfaces: Vec<InterfaceConfig>,
    /// Initial state of every configured signal.
    pub store: WaveformStore,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load the base config at `path` and every wave file it references.
///
/// # Errors
/// Returns an error if any file cannot be read, is not valid YAML for its
/// schema, or violates one of the [`ConfigError`] rules.
pub fn load(path: &Path) -> Result<SimulationConfig> {
    info!("Loading base configuration from: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
    let base: BaseConfigFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

    if base.interfaces.is_empty() {
        return Err(ConfigError::NoInterfaces.into());
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut seen = HashSet::new();
    let mut interfaces = Vec::with_capacity(base.interfaces.len());
    let mut wave_files = Vec::with_capacity(base.interfaces.len());
    let mut period: Option<Duration> = None;

    for entry in base.interfaces {
        if !seen.insert(entry.interface_name.clone()) {
            return Err(ConfigError::DuplicateInterface(entry.interface_name).into());
        }

        let iface = InterfaceConfig {
            dbc_path: base_dir.join(&entry.dbc_file_name),
            wave_path: base_dir.join(&entry.custom_wave_file),
            name: entry.interface_name,
        };

        let waves = parse_wave_file(&iface.wave_path)
            .with_context(|| format!("Invalid wave file for interface '{}'", iface.name))?;

        match period {
            None => period = Some(waves.period),
            Some(expected) if expected != waves.period => {
                return Err(ConfigError::ConflictingDuration {
                    interface: iface.name,
                    expected,
                    found: waves.period,
                }
                .into());
            }
            Some(_) => {}
        }

        debug!(
            "  Interface: {} | DBC: {} | waves: {} | signals: {}",
            iface.name,
            iface.dbc_path.display(),
            iface.wave_path.display(),
            waves.declarations.len()
        );

        wave_files.push((iface.name.clone(), waves));
        interfaces.push(iface);
    }

    let store = build_store(&wave_files)?;
    // `interfaces` is non-empty, so the period has been set.
    let period = period.unwrap_or_default();

    info!(
        "Successfully loaded {} interface(s), {} signal(s), period {:?}",
        interfaces.len(),
        store.signal_count(),
        period
    );

    Ok(SimulationConfig {
        period,
        interfaces,
        store,
    })
}

/// Read and flatten one wave file.
pub fn parse_wave_file(path: &Path) -> Result<WaveFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open wave file: {}", path.display()))?;
    parse_wave_str(&content).with_context(|| format!("Failed to parse wave file: {}", path.display()))
}

/// Flatten wave-file YAML text into a [`WaveFile`].
pub fn parse_wave_str(content: &str) -> Result<WaveFile> {
    let raw: WaveFileRaw = serde_yaml::from_str(content)?;
    let section = raw.wave_config;

    let period = parse_period(&section.update_duration)?;

    let mut declarations = Vec::new();
    for entry in section.wave_forms {
        match entry.set {
            WaveSet::Single { message } => {
                for sig in message.message_signals {
                    declarations.push(SignalDeclaration {
                        message: message.message_name.clone(),
                        signal: sig.signal_name,
                        wave: sig.shape.to_wave(),
                    });
                }
            }
            WaveSet::Multi { message } => {
                let shared = message.parts_config.to_wave();
                for part in message.parts {
                    for signal in part.message_signals {
                        declarations.push(SignalDeclaration {
                            message: part.message_name.clone(),
                            signal,
                            wave: shared.clone(),
                        });
                    }
                }
            }
        }
    }

    Ok(WaveFile {
        period,
        declarations,
    })
}

fn parse_period(d: &UpdateDuration) -> Result<Duration, ConfigError> {
    if d.duration == 0 {
        return Err(ConfigError::ZeroDuration);
    }
    match d.unit.trim() {
        "us" => Ok(Duration::from_micros(d.duration)),
        "ms" => Ok(Duration::from_millis(d.duration)),
        "s" => Ok(Duration::from_secs(d.duration)),
        other => Err(ConfigError::UnsupportedDurationUnit(other.to_string())),
    }
}

/// Build the initial [`WaveformStore`] from `(interface, wave file)` pairs.
///
/// # Errors
/// * [`ConfigError::EmptyWave`] – a declaration has no keyframes.
/// * [`ConfigError::DuplicateSignal`] – the same (interface, message, signal)
///   is declared twice, in one set or across sets.
pub fn build_store(wave_files: &[(String, WaveFile)]) -> Result<WaveformStore, ConfigError> {
    let mut store = WaveformStore::new();

    for (interface, file) in wave_files {
        for decl in &file.declarations {
            if decl.wave.keyframes.is_empty() {
                return Err(ConfigError::EmptyWave {
                    interface: interface.clone(),
                    message: decl.message.clone(),
                    signal: decl.signal.clone(),
                });
            }
            if store
                .insert(interface, &decl.message, &decl.signal, decl.wave.clone())
                .is_some()
            {
                return Err(ConfigError::DuplicateSignal {
                    interface: interface.clone(),
                    message: decl.message.clone(),
                    signal: decl.signal.clone(),
                });
            }
            debug!(
                interface = %interface,
                msg = %decl.message,
                signal = %decl.signal,
                keyframes = decl.wave.keyframes.len(),
                transition = ?decl.wave.transition,
                noise = decl.wave.noise,
                "  signal configured"
            );
        }
    }

    Ok(store)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WAVES: &str = r#"
waveConfig:
  updateDuration:
    unit: ms
    duration: 10
  waveForms:
    - Set:
        Typ: single
        message:
          messageName: Engine
          messageSignals:
            - signalName: Rpm
              signalNoise: 3
              transformType: linear
              wave:
                0: 800
                100: 3000
            - signalName: Temp
              signalNoise: 0
              transformType: static
              initialValue: -40
              wave: { 10: 90.5 }
    - Set:
        Typ: multi
        message:
          partsConfig:
            signalNoise: 0
            transformType: static
            wave: { 0: 1, 50: 0 }
          parts:
            - messageName: Lights
              messageSignals: [Left, Right]
            - messageName: Dash
              messageSignals: [Warn]
"#;

    /// Helper: write `files` into a fresh temp dir and return it.
    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn base(entries: &[(&str, &str)]) -> String {
        let mut s = String::from("BaseConfig:\n");
        for (iface, waves) in entries {
            s.push_str(&format!(
                "  - interfaceName: {iface}\n    dbcFileName: {iface}.dbc\n    customWaveFile: {waves}\n"
            ));
        }
        s
    }

    fn waves_with_period(unit: &str, duration: u64) -> String {
        format!(
            "waveConfig:\n  updateDuration:\n    unit: {unit}\n    duration: {duration}\n  waveForms: []\n"
        )
    }

    // ── parse_wave_str ────────────────────────────────────────────────────────

    #[test]
    fn single_set_flattens_signals() {
        let file = parse_wave_str(WAVES).unwrap();
        assert_eq!(file.period, Duration::from_millis(10));

        let rpm = &file.declarations[0];
        assert_eq!((rpm.message.as_str(), rpm.signal.as_str()), ("Engine", "Rpm"));
        assert_eq!(rpm.wave.transition, Transition::Linear);
        assert_eq!(rpm.wave.noise, 3);
        assert_eq!(rpm.wave.keyframes.get(&100), Some(&3000.0));

        let temp = &file.declarations[1];
        assert_eq!(temp.wave.current_value, -40.0);
        assert_eq!(temp.wave.keyframes.get(&10), Some(&90.5));
    }

    #[test]
    fn multi_set_copies_one_wave_to_every_part() {
        let file = parse_wave_str(WAVES).unwrap();
        let multi: Vec<_> = file.declarations[2..].iter().collect();
        let names: Vec<(&str, &str)> = multi
            .iter()
            .map(|d| (d.message.as_str(), d.signal.as_str()))
            .collect();
        assert_eq!(names, vec![("Lights", "Left"), ("Lights", "Right"), ("Dash", "Warn")]);
        assert!(multi.iter().all(|d| d.wave == multi[0].wave));
    }

    #[test]
    fn unknown_transform_type_is_rejected() {
        let yaml = WAVES.replace("transformType: linear", "transformType: cubic");
        assert!(parse_wave_str(&yaml).is_err());
    }

    #[test]
    fn unknown_set_type_is_rejected() {
        let yaml = WAVES.replace("Typ: single", "Typ: triple");
        assert!(parse_wave_str(&yaml).is_err());
    }

    #[test]
    fn period_units() {
        let us = parse_wave_str(&waves_with_period("us", 500)).unwrap();
        assert_eq!(us.period, Duration::from_micros(500));
        let s = parse_wave_str(&waves_with_period("s", 2)).unwrap();
        assert_eq!(s.period, Duration::from_secs(2));

        let err = parse_wave_str(&waves_with_period("min", 1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnsupportedDurationUnit("min".into()))
        );
        let err = parse_wave_str(&waves_with_period("ms", 0)).unwrap_err();
        assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::ZeroDuration));
    }

    // ── build_store ───────────────────────────────────────────────────────────

    #[test]
    fn build_store_indexes_by_interface() {
        let file = parse_wave_str(WAVES).unwrap();
        let store = build_store(&[("vcan0".into(), file)]).unwrap();
        assert_eq!(store.signal_count(), 5);
        assert!(store.get("vcan0", "Dash", "Warn").is_some());
        assert!(store.get("vcan1", "Dash", "Warn").is_none());
    }

    #[test]
    fn same_signal_on_two_interfaces_is_allowed() {
        let file = parse_wave_str(WAVES).unwrap();
        let store = build_store(&[("vcan0".into(), file.clone()), ("vcan1".into(), file)]).unwrap();
        assert_eq!(store.signal_count(), 10);
    }

    #[test]
    fn duplicate_signal_is_rejected() {
        let mut file = parse_wave_str(WAVES).unwrap();
        let dup = file.declarations[0].clone();
        file.declarations.push(dup);
        assert_eq!(
            build_store(&[("vcan0".into(), file)]).unwrap_err(),
            ConfigError::DuplicateSignal {
                interface: "vcan0".into(),
                message: "Engine".into(),
                signal: "Rpm".into(),
            }
        );
    }

    #[test]
    fn empty_wave_is_rejected() {
        let yaml = WAVES.replace("wave: { 10: 90.5 }", "wave: {}");
        let file = parse_wave_str(&yaml).unwrap();
        assert!(matches!(
            build_store(&[("vcan0".into(), file)]),
            Err(ConfigError::EmptyWave { ref signal, .. }) if signal == "Temp"
        ));
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_resolves_paths_relative_to_base_config() {
        let base_yaml = base(&[("vcan0", "waves.yaml")]);
        let dir = config_dir(&[("waves.yaml", WAVES), ("base.yaml", base_yaml.as_str())]);
        let cfg = load(&dir.path().join("base.yaml")).unwrap();

        assert_eq!(cfg.period, Duration::from_millis(10));
        assert_eq!(cfg.interfaces.len(), 1);
        assert_eq!(cfg.interfaces[0].name, "vcan0");
        assert_eq!(cfg.interfaces[0].dbc_path, dir.path().join("vcan0.dbc"));
        assert_eq!(cfg.interfaces[0].wave_path, dir.path().join("waves.yaml"));
        assert_eq!(cfg.store.signal_count(), 5);
    }

    #[test]
    fn load_rejects_conflicting_periods() {
        let fast = waves_with_period("ms", 10);
        let slow = waves_with_period("ms", 20);
        let base_yaml = base(&[("vcan0", "a.yaml"), ("vcan1", "b.yaml")]);
        let dir = config_dir(&[
            ("a.yaml", fast.as_str()),
            ("b.yaml", slow.as_str()),
            ("base.yaml", base_yaml.as_str()),
        ]);
        let err = load(&dir.path().join("base.yaml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ConflictingDuration { interface, .. }) if interface == "vcan1"
        ));
    }

    #[test]
    fn load_rejects_duplicate_interface() {
        let w = waves_with_period("ms", 10);
        let base_yaml = base(&[("vcan0", "w.yaml"), ("vcan0", "w.yaml")]);
        let dir = config_dir(&[("w.yaml", w.as_str()), ("base.yaml", base_yaml.as_str())]);
        let err = load(&dir.path().join("base.yaml")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::DuplicateInterface("vcan0".into()))
        );
    }

    #[test]
    fn load_rejects_empty_interface_list() {
        let dir = config_dir(&[("base.yaml", "BaseConfig: []\n")]);
        let err = load(&dir.path().join("base.yaml")).unwrap_err();
        assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::NoInterfaces));
    }

    #[test]
    fn missing_file_returns_error() {
        assert!(load(Path::new("/nonexistent/path/base.yaml")).is_err());
    }

    #[test]
    fn missing_wave_file_returns_error() {
        let base_yaml = base(&[("vcan0", "absent.yaml")]);
        let dir = config_dir(&[("base.yaml", base_yaml.as_str())]);
        assert!(load(&dir.path().join("base.yaml")).is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let dir = config_dir(&[("base.yaml", "this is: not: valid: yaml: content:::")]);
        assert!(load(&dir.path().join("base.yaml")).is_err());
    }
}
