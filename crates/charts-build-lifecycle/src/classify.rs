//! Pure classification of chart versions against a lifecycle policy
//!
//! Every function partitions its input: each version lands in exactly one
//! bucket of the returned struct. The one exception is the release split,
//! which drops release candidates.

use crate::asset::{Asset, AssetsMap};
use crate::error::LifecycleError;
use crate::rules::LifecyclePolicy;

/// Current-branch versions split by the lifecycle window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleSplit {
    pub in_lifecycle: AssetsMap,
    pub out_lifecycle: AssetsMap,
}

/// Development versions compared with the released ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossBranch {
    /// Released and in the window (OK)
    pub released_in_lifecycle: AssetsMap,
    /// Not released and outside the window (OK)
    pub not_released_out_lifecycle: AssetsMap,
    /// Not released but in the window (WARN)
    pub not_released_in_lifecycle: AssetsMap,
    /// Released but outside the window (ERROR)
    pub released_out_lifecycle: AssetsMap,
}

/// Unreleased in-window versions split into release and forward-port work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSplit {
    pub to_be_released: AssetsMap,
    pub to_be_forward_ported: AssetsMap,
}

/// A release split interrupted by a policy error
#[derive(Debug)]
pub struct PartialSplit {
    /// Buckets filled before the error
    pub split: ReleaseSplit,
    pub error: LifecycleError,
}

fn push(map: &mut AssetsMap, chart: &str, asset: &Asset) {
    map.entry(chart.to_string()).or_default().push(asset.clone());
}

/// Split the current branch's versions by `in_lifecycle`
pub fn classify_current_branch(current: &AssetsMap, policy: &dyn LifecyclePolicy) -> LifecycleSplit {
    let mut split = LifecycleSplit::default();
    for (chart, versions) in current {
        for asset in versions {
            let bucket = if policy.in_lifecycle(&asset.version) {
                &mut split.in_lifecycle
            } else {
                &mut split.out_lifecycle
            };
            push(bucket, chart, asset);
        }
    }
    split
}

/// Bucket every development version by (released, in window)
///
/// A version counts as released only when the exact version string is in
/// `released` for the same chart.
pub fn compare_released_and_development(
    released: &AssetsMap,
    development: &AssetsMap,
    policy: &dyn LifecyclePolicy,
) -> CrossBranch {
    let mut result = CrossBranch::default();
    for (chart, versions) in development {
        let released_versions = released.get(chart).map(Vec::as_slice).unwrap_or(&[]);
        for asset in versions {
            let is_released = released_versions.iter().any(|r| r.version == asset.version);
            let in_window = policy.in_lifecycle(&asset.version);

            let bucket = match (is_released, in_window) {
                (true, true) => &mut result.released_in_lifecycle,
                (false, false) => &mut result.not_released_out_lifecycle,
                (false, true) => &mut result.not_released_in_lifecycle,
                (true, false) => &mut result.released_out_lifecycle,
            };
            push(bucket, chart, asset);
        }
    }
    result
}

/// Decide which unreleased in-window versions ship now and which move forward
///
/// `should_release` is evaluated before the release-candidate check, so an
/// unparseable RC version still aborts the split.
pub fn separate_release_from_forward_port(
    not_released_in_lifecycle: &AssetsMap,
    policy: &dyn LifecyclePolicy,
) -> Result<ReleaseSplit, PartialSplit> {
    let mut split = ReleaseSplit::default();
    for (chart, versions) in not_released_in_lifecycle {
        for asset in versions {
            let release = match policy.should_release(&asset.version) {
                Ok(release) => release,
                Err(error) => return Err(PartialSplit { split, error }),
            };
            if policy.is_release_candidate(&asset.version) {
                tracing::debug!(chart = %chart, version = %asset.version, "skipping release candidate");
                continue;
            }
            let bucket = if release {
                &mut split.to_be_released
            } else {
                &mut split.to_be_forward_ported
            };
            push(bucket, chart, asset);
        }
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::assets_from;
    use crate::error::Result;
    use crate::rules::VersionRules;

    /// Window: major >= 1; every non-RC version gets released
    struct ReleaseEverything;

    impl LifecyclePolicy for ReleaseEverything {
        fn in_lifecycle(&self, version: &str) -> bool {
            semver::Version::parse(version).is_ok_and(|v| v.major >= 1)
        }

        fn should_release(&self, _version: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn versions(map: &AssetsMap, chart: &str) -> Vec<String> {
        map.get(chart)
            .map(|v| v.iter().map(|a| a.version.clone()).collect())
            .unwrap_or_default()
    }

    fn count(map: &AssetsMap) -> usize {
        map.values().map(Vec::len).sum()
    }

    #[test]
    fn test_nginx_release_scenario() {
        let released = assets_from([("nginx", vec!["1.2.0"])]);
        let development = assets_from([("nginx", vec!["1.2.0", "1.3.0-rc1", "1.3.0"])]);
        let policy = ReleaseEverything;

        let cross = compare_released_and_development(&released, &development, &policy);
        assert_eq!(versions(&cross.released_in_lifecycle, "nginx"), vec!["1.2.0"]);
        assert_eq!(
            versions(&cross.not_released_in_lifecycle, "nginx"),
            vec!["1.3.0-rc1", "1.3.0"]
        );
        assert!(cross.released_out_lifecycle.is_empty());
        assert!(cross.not_released_out_lifecycle.is_empty());

        let split = separate_release_from_forward_port(&cross.not_released_in_lifecycle, &policy)
            .unwrap();
        assert_eq!(versions(&split.to_be_released, "nginx"), vec!["1.3.0"]);
        assert!(split.to_be_forward_ported.is_empty());
    }

    #[test]
    fn test_cross_branch_buckets_are_disjoint() {
        let rules = VersionRules::from_yaml(
            r#"
branchVersion: "2.9"
lifecycleBranches: 1
rules:
  "2.9": { min: "104.0.0", max: "105.0.0" }
  "2.8": { min: "103.0.0", max: "104.0.0" }
"#,
        )
        .unwrap();
        let released = assets_from([
            ("fleet", vec!["103.0.0", "102.0.0"]),
            ("cis", vec!["104.0.0"]),
        ]);
        let development = assets_from([
            ("fleet", vec!["104.1.0", "103.0.0", "102.0.0", "101.0.0"]),
            ("cis", vec!["104.0.0", "104.0.1-rc1"]),
            ("logging", vec!["104.0.0"]),
        ]);

        let cross = compare_released_and_development(&released, &development, &rules);
        let buckets = [
            &cross.released_in_lifecycle,
            &cross.not_released_out_lifecycle,
            &cross.not_released_in_lifecycle,
            &cross.released_out_lifecycle,
        ];
        assert_eq!(buckets.iter().map(|b| count(b)).sum::<usize>(), count(&development));

        for (chart, assets) in &development {
            for asset in assets {
                let hits = buckets
                    .iter()
                    .filter(|b| b.get(chart).is_some_and(|v| v.contains(asset)))
                    .count();
                assert_eq!(hits, 1, "{} {} is in {} buckets", chart, asset.version, hits);
            }
        }

        assert_eq!(versions(&cross.released_out_lifecycle, "fleet"), vec!["102.0.0"]);
        assert_eq!(versions(&cross.not_released_out_lifecycle, "fleet"), vec!["101.0.0"]);
        assert_eq!(versions(&cross.released_in_lifecycle, "fleet"), vec!["103.0.0"]);
        assert_eq!(versions(&cross.not_released_in_lifecycle, "logging"), vec!["104.0.0"]);
    }

    #[test]
    fn test_release_candidates_never_scheduled() {
        let rules = VersionRules::from_yaml(
            r#"
branchVersion: "2.9"
rules:
  "2.9": { min: "104.0.0", max: "105.0.0" }
  "2.8": { min: "103.0.0", max: "104.0.0" }
"#,
        )
        .unwrap();
        let pending = assets_from([
            ("fleet", vec!["104.1.0", "104.2.0-rc1", "103.5.0", "103.6.0-rc.1"]),
        ]);

        let split = separate_release_from_forward_port(&pending, &rules).unwrap();
        assert_eq!(versions(&split.to_be_released, "fleet"), vec!["104.1.0"]);
        assert_eq!(versions(&split.to_be_forward_ported, "fleet"), vec!["103.5.0"]);
    }

    #[test]
    fn test_policy_error_keeps_partial_split() {
        let rules = VersionRules::from_yaml(
            "branchVersion: \"2.9\"\nrules:\n  \"2.9\": { min: \"104.0.0\", max: \"105.0.0\" }\n",
        )
        .unwrap();
        let pending = assets_from([("a-chart", vec!["104.0.0"]), ("b-chart", vec!["104"])]);

        let partial = separate_release_from_forward_port(&pending, &rules).unwrap_err();
        assert_eq!(versions(&partial.split.to_be_released, "a-chart"), vec!["104.0.0"]);
        assert!(matches!(partial.error, LifecycleError::PolicyEvaluation { .. }));
    }

    #[test]
    fn test_current_branch_split() {
        let split = classify_current_branch(
            &assets_from([("nginx", vec!["0.9.0", "1.0.0"])]),
            &ReleaseEverything,
        );
        assert_eq!(versions(&split.in_lifecycle, "nginx"), vec!["1.0.0"]);
        assert_eq!(versions(&split.out_lifecycle, "nginx"), vec!["0.9.0"]);
    }
}
