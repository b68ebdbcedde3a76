//! Version policy resolution.
//!
//! The decision for a package depends only on its requirement and the
//! installed/latest versions passed in. Nothing here touches the host.

use crate::requirements::{Policy, Requirement};
use crate::version::PackageVersion;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Installing,
    Upgrading,
    Downgrading,
    Matched,
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Installing => "installing",
            Status::Upgrading => "upgrading",
            Status::Downgrading => "downgrading",
            Status::Matched => "matched",
            Status::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// The version an install should aim at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pin {
    Exact(String),
    AtLeast(String),
    Newest,
}

impl Pin {
    pub fn for_requirement(req: &Requirement) -> Self {
        match req.policy() {
            Policy::Exact => Pin::Exact(req.target().to_string()),
            Policy::Min => Pin::AtLeast(req.target().to_string()),
            Policy::Latest => Pin::Newest,
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Exact(v) => write!(f, "=={v}"),
            Pin::AtLeast(v) => write!(f, ">={v}"),
            Pin::Newest => write!(f, "newest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: Status,
    pub pin: Pin,
    pub detail: String,
}

impl Decision {
    fn new(status: Status, pin: Pin, detail: impl Into<String>) -> Self {
        Self {
            status,
            pin,
            detail: detail.into(),
        }
    }
}

fn parse_known(v: Option<&str>) -> Option<PackageVersion> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(PackageVersion::parse)
}

/// Resolves the full decision for one requirement.
pub fn decide(req: &Requirement, installed: Option<&str>, latest: Option<&str>) -> Decision {
    let pin = Pin::for_requirement(req);

    let installed_raw = match installed.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw,
        None => return Decision::new(Status::Installing, pin, "not installed"),
    };
    let Some(current) = PackageVersion::parse(installed_raw) else {
        return Decision::new(
            Status::Skipped,
            pin,
            format!("installed version {installed_raw:?} is not comparable"),
        );
    };

    let target = parse_known(Some(req.target()));
    let latest = parse_known(latest);

    match req.policy() {
        Policy::Exact | Policy::Min => {
            let Some(target) = target else {
                return Decision::new(
                    Status::Skipped,
                    pin,
                    format!("target {:?} is not comparable", req.target()),
                );
            };
            match (req.policy(), current.cmp(&target)) {
                (_, Ordering::Equal) => {
                    Decision::new(Status::Matched, pin, format!("{current} == {target}"))
                }
                (_, Ordering::Less) => {
                    Decision::new(Status::Upgrading, pin, format!("{current} < {target}"))
                }
                (Policy::Min, Ordering::Greater) => {
                    Decision::new(Status::Matched, pin, format!("{current} >= {target}"))
                }
                (_, Ordering::Greater) => Decision::new(
                    Status::Downgrading,
                    pin,
                    format!("{current} > {target} (pinned)"),
                ),
            }
        }
        Policy::Latest => match (latest, target) {
            (Some(latest), _) if current < latest => {
                Decision::new(Status::Upgrading, pin, format!("{current} < latest {latest}"))
            }
            (Some(latest), _) => {
                Decision::new(Status::Matched, pin, format!("{current} is latest ({latest})"))
            }
            (None, Some(target)) if current < target => Decision::new(
                Status::Upgrading,
                Pin::AtLeast(target.to_string()),
                format!("{current} < {target}, latest unknown"),
            ),
            (None, Some(target)) => Decision::new(
                Status::Matched,
                pin,
                format!("{current} >= {target}, latest unknown"),
            ),
            (None, None) => Decision::new(
                Status::Skipped,
                pin,
                "latest version unknown and no target to compare",
            ),
        },
    }
}

/// Status for one requirement given its installed and latest versions.
pub fn policy_management(
    req: &Requirement,
    installed: Option<&str>,
    latest: Option<&str>,
) -> Status {
    decide(req, installed, latest).status
}
