// SPDX-License-Identifier: MIT OR Apache-2.0

//! Textual identifiers of applications.
//!
//! Three grammars are accepted wherever a script refers to an app:
//!
//! - App identifier: `<name>[.<registry>][:<index>]`, e.g. `voting`, `voting:1` or
//!   `voting.open:0`. The index counts installed instances of the same app in installation
//!   order and defaults to `0`.
//! - Labeled identifier: `<name>[.<registry>]:<label>`, e.g. `vault:treasury`, refers to an app
//!   installed earlier in the same script which has no chain-assigned index yet.
//! - DAO-prefixed identifier: `_<dao>:<app or labeled identifier>`, e.g. `_parent:agent:0`,
//!   qualifies either of the above with the organization it belongs to.
use std::fmt;
use std::str::FromStr;

use kernelscript_core::Address;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AclError;

/// Lowercase name or registry segment of at most 63 characters, no leading or trailing `-`.
const SEGMENT: &str = "[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?";

/// Label of at most 63 characters. Labels made of digits only are read as an index.
const LABEL: &str = "[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?";

static APP_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        "^(?P<name>{SEGMENT})(?:\\.(?P<registry>{SEGMENT}(?:\\.{SEGMENT})*))?\
         (?::(?:(?P<index>[0-9]+)|(?P<label>{LABEL})))?$"
    );
    // Unwrap as we checked the regular expression for correctness
    Regex::new(&pattern).unwrap()
});

static DAO_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Unwrap as we checked the regular expression for correctness
    Regex::new("^_(?P<dao>[^:]+):(?P<rest>.+)$").unwrap()
});

/// Reference to an installed app by name and installation index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppIdentifier {
    pub name: String,
    pub registry: Option<String>,
    pub index: u32,
}

impl AppIdentifier {
    pub fn new(name: impl Into<String>, registry: Option<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            registry,
            index,
        }
    }
}

impl fmt::Display for AppIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_name(f, &self.name, self.registry.as_deref())?;
        write!(f, ":{}", self.index)
    }
}

impl FromStr for AppIdentifier {
    type Err = AclError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.parse::<AppRef>()? {
            AppRef::Indexed(identifier) => Ok(identifier),
            AppRef::Labeled(_) => Err(invalid(value)),
        }
    }
}

/// Reference to an app installed within the running script.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabeledAppIdentifier {
    pub name: String,
    pub registry: Option<String>,
    pub label: String,
}

impl LabeledAppIdentifier {
    pub fn new(
        name: impl Into<String>,
        registry: Option<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            registry,
            label: label.into(),
        }
    }
}

impl fmt::Display for LabeledAppIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_name(f, &self.name, self.registry.as_deref())?;
        write!(f, ":{}", self.label)
    }
}

impl FromStr for LabeledAppIdentifier {
    type Err = AclError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.parse::<AppRef>()? {
            AppRef::Labeled(identifier) => Ok(identifier),
            AppRef::Indexed(_) => Err(invalid(value)),
        }
    }
}

/// Key of an app inside an organization, either indexed or labeled.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AppRef {
    Indexed(AppIdentifier),
    Labeled(LabeledAppIdentifier),
}

impl AppRef {
    pub fn name(&self) -> &str {
        match self {
            AppRef::Indexed(identifier) => &identifier.name,
            AppRef::Labeled(identifier) => &identifier.name,
        }
    }

    pub fn registry(&self) -> Option<&str> {
        match self {
            AppRef::Indexed(identifier) => identifier.registry.as_deref(),
            AppRef::Labeled(identifier) => identifier.registry.as_deref(),
        }
    }
}

impl From<AppIdentifier> for AppRef {
    fn from(value: AppIdentifier) -> Self {
        AppRef::Indexed(value)
    }
}

impl From<LabeledAppIdentifier> for AppRef {
    fn from(value: LabeledAppIdentifier) -> Self {
        AppRef::Labeled(value)
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppRef::Indexed(identifier) => write!(f, "{identifier}"),
            AppRef::Labeled(identifier) => write!(f, "{identifier}"),
        }
    }
}

impl FromStr for AppRef {
    type Err = AclError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let captures = APP_REGEX.captures(value).ok_or_else(|| invalid(value))?;

        // The name group is not optional, the pattern would not have matched otherwise
        let name = captures.name("name").map_or("", |m| m.as_str());
        let registry = captures.name("registry").map(|m| m.as_str().to_string());

        if let Some(label) = captures.name("label") {
            return Ok(AppRef::Labeled(LabeledAppIdentifier::new(
                name,
                registry,
                label.as_str(),
            )));
        }

        let index = match captures.name("index") {
            Some(index) => index.as_str().parse::<u32>().map_err(|_| invalid(value))?,
            None => 0,
        };

        Ok(AppRef::Indexed(AppIdentifier::new(name, registry, index)))
    }
}

/// Anything which can be resolved to an address given a scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Address(Address),
    App { dao: Option<String>, app: AppRef },
}

impl From<Address> for Entity {
    fn from(value: Address) -> Self {
        Entity::Address(value)
    }
}

impl From<AppIdentifier> for Entity {
    fn from(value: AppIdentifier) -> Self {
        Entity::App {
            dao: None,
            app: value.into(),
        }
    }
}

impl From<LabeledAppIdentifier> for Entity {
    fn from(value: LabeledAppIdentifier) -> Self {
        Entity::App {
            dao: None,
            app: value.into(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Address(address) => write!(f, "{address}"),
            Entity::App { dao: Some(dao), app } => write!(f, "_{dao}:{app}"),
            Entity::App { dao: None, app } => write!(f, "{app}"),
        }
    }
}

impl FromStr for Entity {
    type Err = AclError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse(value)
    }
}

/// Parse an address, app identifier, labeled identifier or DAO-prefixed identifier.
pub fn parse(identifier: &str) -> Result<Entity, AclError> {
    if identifier.starts_with("0x") || identifier.starts_with("0X") {
        let address = identifier
            .parse::<Address>()
            .map_err(|_| invalid(identifier))?;
        return Ok(Entity::Address(address));
    }

    let (dao, rest) = parse_dao_prefix(identifier)?;
    let app = rest.parse::<AppRef>().map_err(|_| invalid(identifier))?;

    Ok(Entity::App {
        dao: dao.map(str::to_string),
        app,
    })
}

/// Split an identifier into its optional organization prefix and the remainder.
///
/// Identifiers starting with `_` carry a prefix terminated by the first `:`.
pub fn parse_dao_prefix(identifier: &str) -> Result<(Option<&str>, &str), AclError> {
    if !identifier.starts_with('_') {
        return Ok((None, identifier));
    }

    let captures = DAO_PREFIX_REGEX
        .captures(identifier)
        .ok_or_else(|| invalid(identifier))?;

    match (captures.name("dao"), captures.name("rest")) {
        (Some(dao), Some(rest)) => Ok((Some(dao.as_str()), rest.as_str())),
        _ => Err(invalid(identifier)),
    }
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str, registry: Option<&str>) -> fmt::Result {
    match registry {
        Some(registry) => write!(f, "{name}.{registry}"),
        None => write!(f, "{name}"),
    }
}

fn invalid(identifier: &str) -> AclError {
    AclError::InvalidIdentifier(identifier.to_string())
}

#[cfg(test)]
mod tests {
    use kernelscript_core::Address;

    use crate::error::AclError;

    use super::{AppIdentifier, AppRef, Entity, LabeledAppIdentifier, parse, parse_dao_prefix};

    #[test]
    fn app_identifiers() {
        assert_eq!(
            parse("voting").unwrap(),
            AppIdentifier::new("voting", None, 0).into()
        );
        assert_eq!(
            parse("token-manager:2").unwrap(),
            AppIdentifier::new("token-manager", None, 2).into()
        );
        assert_eq!(
            parse("voting.open:1").unwrap(),
            AppIdentifier::new("voting", Some("open".into()), 1).into()
        );
        assert_eq!(
            "agent".parse::<AppIdentifier>().unwrap().to_string(),
            "agent:0"
        );
    }

    #[test]
    fn labeled_identifiers() {
        assert_eq!(
            parse("vault:treasury").unwrap(),
            LabeledAppIdentifier::new("vault", None, "treasury").into()
        );
        assert_eq!(
            parse("voting.open:new-Voting2").unwrap(),
            LabeledAppIdentifier::new("voting", Some("open".into()), "new-Voting2").into()
        );
        assert!("vault:0".parse::<LabeledAppIdentifier>().is_err());
        assert!("vault:treasury".parse::<AppIdentifier>().is_err());
    }

    #[test]
    fn dao_prefixed_identifiers() {
        assert_eq!(
            parse_dao_prefix("_parent:agent:1").unwrap(),
            (Some("parent"), "agent:1")
        );
        assert_eq!(parse_dao_prefix("agent:1").unwrap(), (None, "agent:1"));

        let entity = parse("_1:vault:treasury").unwrap();
        assert_eq!(
            entity,
            Entity::App {
                dao: Some("1".into()),
                app: AppRef::Labeled(LabeledAppIdentifier::new("vault", None, "treasury")),
            }
        );
        assert_eq!(entity.to_string(), "_1:vault:treasury");
    }

    #[test]
    fn addresses() {
        let entity = parse("0x8401Eb5ff34cc943f096A32EF3d5113FEbE8D4Eb").unwrap();
        let address: Address = "0x8401eb5ff34cc943f096a32ef3d5113febe8d4eb".parse().unwrap();
        assert_eq!(entity, Entity::Address(address));
    }

    #[test]
    fn segment_and_tag_grammar() {
        let longest = "a".repeat(63);
        assert_eq!(
            parse(&format!("{longest}.{longest}.eth")).unwrap(),
            AppIdentifier::new(longest.as_str(), Some(format!("{longest}.eth")), 0).into()
        );
        assert!(parse(&"a".repeat(64)).is_err());
        assert!(parse(&format!("voting.{}", "b".repeat(64))).is_err());
        assert!(parse(&format!("voting:{}", "c".repeat(64))).is_err());

        // Digits only make an index, anything else a label
        assert_eq!(
            parse("agent:007").unwrap(),
            AppIdentifier::new("agent", None, 7).into()
        );
        assert_eq!(
            parse("agent:12ab").unwrap(),
            LabeledAppIdentifier::new("agent", None, "12ab").into()
        );
        assert_eq!(
            parse("x-1.aragonpm.eth:a").unwrap(),
            LabeledAppIdentifier::new("x-1", Some("aragonpm.eth".into()), "a").into()
        );

        assert_eq!(
            parse_dao_prefix("_0x12ab:voting.open:label").unwrap(),
            (Some("0x12ab"), "voting.open:label")
        );
        assert_eq!(parse_dao_prefix("plain").unwrap(), (None, "plain"));
    }

    #[test]
    fn invalid_identifiers() {
        for identifier in [
            "",
            "Voting",
            "voting.Open",
            "voting.-open",
            "voting.open.",
            "voting:label-",
            "vot ing",
            "-voting",
            "voting-",
            "voting:",
            "voting:-label",
            "voting..open",
            "voting:1:2",
            "voting:label_with_underscore",
            "_:voting",
            "_dao",
            "_dao:",
            "_dao:Voting",
            "0x1234",
            "voting:99999999999",
        ] {
            assert_eq!(
                parse(identifier),
                Err(AclError::InvalidIdentifier(identifier.into())),
                "{identifier} should be invalid"
            );
        }
    }
}
