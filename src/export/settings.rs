//! Persistent export settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::util::{Error, Result};

/// Rendering technique written to the `integrator` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Integrator {
    Direct,
    PathTracer,
    AdjointParticleTracer,
    Bidirectional,
    KelemenMLT,
    VeachMLT,
    ERPT,
}

impl Integrator {
    /// All variants, in legacy index order.
    pub const ALL: [Integrator; 7] = [
        Self::Direct,
        Self::PathTracer,
        Self::AdjointParticleTracer,
        Self::Bidirectional,
        Self::KelemenMLT,
        Self::VeachMLT,
        Self::ERPT,
    ];

    /// Plugin name of the integrator.
    pub fn type_tag(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::PathTracer => "path",
            Self::AdjointParticleTracer => "ptracer",
            Self::Bidirectional => "bdpt",
            Self::KelemenMLT => "pssmlt",
            Self::VeachMLT => "mlt",
            Self::ERPT => "erpt",
        }
    }

    pub fn has_max_depth(self) -> bool {
        self != Self::Direct
    }

    /// Techniques that need the plain independent sampler.
    pub fn requires_independent_sampler(self) -> bool {
        matches!(self, Self::AdjointParticleTracer | Self::KelemenMLT | Self::VeachMLT)
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

impl FromStr for Integrator {
    type Err = Error;

    /// Accepts plugin names, long names and legacy indices `0..=6`.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        if let Ok(index) = key.parse::<usize>() {
            return Self::ALL
                .get(index)
                .copied()
                .ok_or_else(|| Error::UnknownIntegrator(s.to_string()));
        }
        let integrator = match key.as_str() {
            "direct" | "direct_illumination" => Self::Direct,
            "path" | "path_tracer" | "pathtracer" => Self::PathTracer,
            "ptracer" | "adjoint_particle_tracer" | "particle_tracer" => Self::AdjointParticleTracer,
            "bdpt" | "bidirectional" => Self::Bidirectional,
            "pssmlt" | "kelemen_mlt" | "kelemenmlt" => Self::KelemenMLT,
            "mlt" | "veach_mlt" | "veachmlt" => Self::VeachMLT,
            "erpt" => Self::ERPT,
            _ => return Err(Error::UnknownIntegrator(s.to_string())),
        };
        Ok(integrator)
    }
}

/// Export settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Integrator name or legacy index; resolved when an export starts.
    #[serde(deserialize_with = "name_or_index")]
    pub integrator: String,
    pub xres: u32,
    pub yres: u32,
    /// Maximum path depth for every integrator except `direct`.
    pub path_length: u32,
    pub samples_per_pixel: u32,
    /// Write geometry into one binary archive instead of per-mesh OBJ files.
    pub write_serialized: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            integrator: Integrator::Direct.type_tag().to_string(),
            xres: 1024,
            yres: 768,
            path_length: 3,
            samples_per_pixel: 4,
            write_serialized: true,
        }
    }
}

fn name_or_index<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Index(u64),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Name(name) => name,
        Raw::Index(index) => index.to_string(),
    })
}

impl ExportSettings {
    /// Default settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("mts-export");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the default path, falling back to defaults.
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| Self::load_from(&p).ok())
            .unwrap_or_default()
    }

    /// Load settings from an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save settings to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| Error::config("no config directory"))?;
        self.save_to(path)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the configured integrator.
    pub fn integrator(&self) -> Result<Integrator> {
        self.integrator.parse()
    }

    /// Set `xres`/`yres` from a `"WxH"` string.
    pub fn set_resolution(&mut self, text: &str) -> Result<()> {
        let (w, h) = parse_resolution(text)?;
        self.xres = w;
        self.yres = h;
        Ok(())
    }
}

/// Parse a `"WxH"` resolution string such as `"1024x768"`.
pub fn parse_resolution(text: &str) -> Result<(u32, u32)> {
    let invalid = || Error::config(format!("invalid resolution '{}'", text));
    let (w, h) = text
        .trim()
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_integrator_names() {
        assert_eq!("path".parse::<Integrator>().unwrap(), Integrator::PathTracer);
        assert_eq!("Kelemen MLT".parse::<Integrator>().unwrap(), Integrator::KelemenMLT);
        assert_eq!("erpt".parse::<Integrator>().unwrap(), Integrator::ERPT);
        for integrator in Integrator::ALL {
            assert_eq!(integrator.type_tag().parse::<Integrator>().unwrap(), integrator);
        }
    }

    #[test]
    fn test_integrator_indices() {
        assert_eq!("0".parse::<Integrator>().unwrap(), Integrator::Direct);
        assert_eq!("2".parse::<Integrator>().unwrap(), Integrator::AdjointParticleTracer);
        assert_eq!("6".parse::<Integrator>().unwrap(), Integrator::ERPT);
        assert!(matches!("7".parse::<Integrator>(), Err(Error::UnknownIntegrator(s)) if s == "7"));
        assert!(matches!("photon".parse::<Integrator>(), Err(Error::UnknownIntegrator(_))));
    }

    #[test]
    fn test_integrator_traits() {
        assert!(!Integrator::Direct.has_max_depth());
        assert!(Integrator::ERPT.has_max_depth());
        assert!(Integrator::VeachMLT.requires_independent_sampler());
        assert!(!Integrator::Bidirectional.requires_independent_sampler());
    }

    #[test]
    fn test_defaults() {
        let s: ExportSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, ExportSettings::default());
        assert_eq!(s.integrator().unwrap(), Integrator::Direct);
        assert_eq!((s.xres, s.yres), (1024, 768));
        assert_eq!(s.path_length, 3);
        assert_eq!(s.samples_per_pixel, 4);
        assert!(s.write_serialized);
    }

    #[test]
    fn test_legacy_index_in_json() {
        let s: ExportSettings = serde_json::from_str(r#"{ "integrator": 3, "xres": 640 }"#).unwrap();
        assert_eq!(s.integrator().unwrap(), Integrator::Bidirectional);
        assert_eq!(s.xres, 640);
        assert_eq!(s.yres, 768);
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution(" 800 X 600 ").unwrap(), (800, 600));
        assert!(matches!(parse_resolution("1920"), Err(Error::Config(_))));
        assert!(matches!(parse_resolution("0x10"), Err(Error::Config(_))));
        assert!(matches!(parse_resolution("axb"), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = ExportSettings::default();
        s.integrator = "bdpt".into();
        s.set_resolution("320x240").unwrap();
        s.save_to(&path).unwrap();
        assert_eq!(ExportSettings::load_from(&path).unwrap(), s);
    }
}
