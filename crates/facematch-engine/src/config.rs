use crate::compare::MatchSettings;
use facematch_core::{MatchPolicy, FALLBACK_CEILING};
use facematch_io::ImageLoader;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, loaded from `FACEMATCH_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Which match policy decides inclusion.
    pub policy: MatchPolicy,
    /// Threshold used by the pairwise policy.
    pub pairwise_threshold: f32,
    /// Threshold used by the matcher-object policy.
    pub matcher_threshold: f32,
    /// Distances at or above this never become the fallback match.
    pub fallback_ceiling: f32,
    /// Per-image load timeout; `None` waits indefinitely.
    pub load_timeout: Option<Duration>,
    /// Gallery manifest to use when none is given on the command line.
    pub manifest_path: Option<PathBuf>,
    /// Directory that web-style image paths are served from.
    pub image_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let policy = match lookup("FACEMATCH_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring FACEMATCH_POLICY; using pairwise");
                MatchPolicy::Pairwise
            }),
            None => MatchPolicy::default(),
        };

        let timeout_secs = parse_or(&lookup, "FACEMATCH_LOAD_TIMEOUT_SECS", 0u64);

        Self {
            model_dir: lookup("FACEMATCH_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(facematch_core::default_model_dir),
            policy,
            pairwise_threshold: parse_or(
                &lookup,
                "FACEMATCH_PAIRWISE_THRESHOLD",
                MatchPolicy::Pairwise.default_threshold(),
            ),
            matcher_threshold: parse_or(
                &lookup,
                "FACEMATCH_MATCHER_THRESHOLD",
                MatchPolicy::Matcher.default_threshold(),
            ),
            fallback_ceiling: parse_or(&lookup, "FACEMATCH_FALLBACK_CEILING", FALLBACK_CEILING),
            load_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            manifest_path: lookup("FACEMATCH_MANIFEST").map(PathBuf::from),
            image_root: lookup("FACEMATCH_IMAGE_ROOT").map(PathBuf::from),
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        let threshold = match self.policy {
            MatchPolicy::Pairwise => self.pairwise_threshold,
            MatchPolicy::Matcher => self.matcher_threshold,
        };
        MatchSettings {
            policy: self.policy,
            threshold,
            fallback_ceiling: self.fallback_ceiling,
        }
    }

    /// Image loader honouring the configured root and timeout.
    pub fn image_loader(&self) -> ImageLoader {
        let loader = ImageLoader::new().with_timeout(self.load_timeout);
        match &self.image_root {
            Some(root) => loader.with_root(root.clone()),
            None => loader,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.policy, MatchPolicy::Pairwise);
        assert_eq!(cfg.pairwise_threshold, 0.45);
        assert_eq!(cfg.matcher_threshold, 0.5);
        assert_eq!(cfg.fallback_ceiling, 2.0);
        assert!(cfg.load_timeout.is_none());
        assert!(cfg.manifest_path.is_none());
        assert!(cfg.model_dir.ends_with("facematch/models"));
        assert_eq!(cfg.match_settings(), MatchSettings::default());
    }

    #[test]
    fn test_matcher_policy_uses_its_threshold() {
        let cfg = config(&[
            ("FACEMATCH_POLICY", "matcher"),
            ("FACEMATCH_MATCHER_THRESHOLD", "0.6"),
        ]);
        let settings = cfg.match_settings();
        assert_eq!(settings.policy, MatchPolicy::Matcher);
        assert_eq!(settings.threshold, 0.6);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = config(&[
            ("FACEMATCH_POLICY", "cosine"),
            ("FACEMATCH_PAIRWISE_THRESHOLD", "not-a-number"),
            ("FACEMATCH_LOAD_TIMEOUT_SECS", "15"),
            ("FACEMATCH_MODEL_DIR", "/opt/models"),
            ("FACEMATCH_IMAGE_ROOT", "/srv/public"),
        ]);
        assert_eq!(cfg.policy, MatchPolicy::Pairwise);
        assert_eq!(cfg.pairwise_threshold, 0.45);
        assert_eq!(cfg.load_timeout, Some(Duration::from_secs(15)));
        assert_eq!(cfg.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(cfg.image_root, Some(PathBuf::from("/srv/public")));
    }
}
