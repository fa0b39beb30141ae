//! Records exchanged with the reader and writer: entries, change records, DNs.

use crate::dn::is_valid_dn;
use crate::error::{LdifError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attribute type name to its values, in the order they were read or added.
///
/// Keys keep their original case; the map orders them so output is deterministic.
pub type Entry = BTreeMap<String, Vec<Vec<u8>>>;

/// A distinguished name that passed [`is_valid_dn`]. The empty DN is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Dn(String);

impl Dn {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if is_valid_dn(&s) {
            Ok(Dn(s))
        } else {
            Err(LdifError::InvalidDn(s))
        }
    }

    pub fn root() -> Self {
        Dn(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Dn {
    type Err = LdifError;

    fn from_str(s: &str) -> Result<Self> {
        Dn::parse(s)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Value of a `changetype:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Add,
    Delete,
    Modify,
    ModRdn,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Delete => "delete",
            ChangeType::Modify => "modify",
            ChangeType::ModRdn => "modrdn",
        }
    }
}

impl FromStr for ChangeType {
    type Err = LdifError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(ChangeType::Add),
            "delete" => Ok(ChangeType::Delete),
            "modify" => Ok(ChangeType::Modify),
            "modrdn" => Ok(ChangeType::ModRdn),
            other => Err(LdifError::InvalidChangetype(other.to_string())),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation of one group in a modify record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModOp {
    Add,
    Delete,
    Replace,
}

impl ModOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ModOp::Add => "add",
            ModOp::Delete => "delete",
            ModOp::Replace => "replace",
        }
    }

    /// Look up an operation keyword as it appears before the colon of an op line.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "add" => Some(ModOp::Add),
            "delete" => Some(ModOp::Delete),
            "replace" => Some(ModOp::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for ModOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<op>: <type>` group of a modify record with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub op: ModOp,
    pub attr_type: String,
    pub values: Vec<Vec<u8>>,
}

impl Modification {
    pub fn new(op: ModOp, attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Modification {
            op,
            attr_type: attr_type.into(),
            values,
        }
    }
}

/// Untyped modlist item, for callers that build modlists without choosing the record kind.
///
/// `Add` is the two-element form (type, values), `Modify` the three-element form
/// (op, type, values). A modlist must use one form throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModItem {
    Add(String, Vec<Vec<u8>>),
    Modify(ModOp, String, Vec<Vec<u8>>),
}

impl ModItem {
    pub fn arity(&self) -> usize {
        match self {
            ModItem::Add(..) => 2,
            ModItem::Modify(..) => 3,
        }
    }
}

/// Body of a record that carries a `changetype:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    Add(Vec<(String, Vec<Vec<u8>>)>),
    Delete,
    Modify(Vec<Modification>),
    ModRdn {
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    },
}

impl ChangeRecord {
    pub fn changetype(&self) -> ChangeType {
        match self {
            ChangeRecord::Add(_) => ChangeType::Add,
            ChangeRecord::Delete => ChangeType::Delete,
            ChangeRecord::Modify(_) => ChangeType::Modify,
            ChangeRecord::ModRdn { .. } => ChangeType::ModRdn,
        }
    }

    /// Build an add or modify record from an untyped modlist.
    ///
    /// The first item decides the shape; an empty modlist or one mixing both forms is a
    /// [`LdifError::Shape`] error.
    pub fn from_modlist(modlist: &[ModItem]) -> Result<Self> {
        let first = modlist
            .first()
            .ok_or_else(|| LdifError::Shape("empty modlist".to_string()))?;
        let expected = first.arity();
        if let Some((i, item)) = modlist
            .iter()
            .enumerate()
            .find(|(_, item)| item.arity() != expected)
        {
            return Err(LdifError::Shape(format!(
                "modlist item {} has {} elements, expected {}",
                i,
                item.arity(),
                expected
            )));
        }
        let record = match first {
            ModItem::Add(..) => ChangeRecord::Add(
                modlist
                    .iter()
                    .filter_map(|item| match item {
                        ModItem::Add(t, v) => Some((t.clone(), v.clone())),
                        ModItem::Modify(..) => None,
                    })
                    .collect(),
            ),
            ModItem::Modify(..) => ChangeRecord::Modify(
                modlist
                    .iter()
                    .filter_map(|item| match item {
                        ModItem::Modify(op, t, v) => Some(Modification::new(*op, t.clone(), v.clone())),
                        ModItem::Add(..) => None,
                    })
                    .collect(),
            ),
        };
        Ok(record)
    }
}

/// One parsed or to-be-written LDIF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Content record. `dn` is `None` when the input had attributes but no `dn:` line.
    Entry { dn: Option<Dn>, entry: Entry },
    Change { dn: Dn, change: ChangeRecord },
}

impl Record {
    pub fn dn(&self) -> Option<&Dn> {
        match self {
            Record::Entry { dn, .. } => dn.as_ref(),
            Record::Change { dn, .. } => Some(dn),
        }
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Record::Entry { entry, .. } => Some(entry),
            Record::Change { .. } => None,
        }
    }

    pub fn as_change(&self) -> Option<&ChangeRecord> {
        match self {
            Record::Change { change, .. } => Some(change),
            Record::Entry { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dn_parse_validates() {
        assert_eq!(Dn::parse("cn=a,dc=com").unwrap().as_str(), "cn=a,dc=com");
        assert!(Dn::parse("").unwrap().is_root());
        assert!(matches!(Dn::parse("=x"), Err(LdifError::InvalidDn(s)) if s == "=x"));
    }

    #[test]
    fn changetype_lookup() {
        assert_eq!("modrdn".parse::<ChangeType>().unwrap(), ChangeType::ModRdn);
        assert!(matches!(
            "bogus".parse::<ChangeType>(),
            Err(LdifError::InvalidChangetype(s)) if s == "bogus"
        ));
        // Keywords are case-sensitive.
        assert!("Add".parse::<ChangeType>().is_err());
    }

    #[test]
    fn from_modlist_add_and_modify() {
        let add = ChangeRecord::from_modlist(&[
            ModItem::Add("cn".into(), vec![b"a".to_vec()]),
            ModItem::Add("sn".into(), vec![b"b".to_vec()]),
        ])
        .unwrap();
        assert_eq!(add.changetype(), ChangeType::Add);

        let modify = ChangeRecord::from_modlist(&[ModItem::Modify(
            ModOp::Replace,
            "mail".into(),
            vec![b"a@example.com".to_vec()],
        )])
        .unwrap();
        assert_eq!(
            modify,
            ChangeRecord::Modify(vec![Modification::new(
                ModOp::Replace,
                "mail",
                vec![b"a@example.com".to_vec()]
            )])
        );
    }

    #[test]
    fn from_modlist_rejects_mixed_and_empty() {
        let mixed = ChangeRecord::from_modlist(&[
            ModItem::Add("cn".into(), vec![]),
            ModItem::Modify(ModOp::Delete, "sn".into(), vec![]),
        ]);
        assert!(matches!(mixed, Err(LdifError::Shape(_))));
        assert!(matches!(ChangeRecord::from_modlist(&[]), Err(LdifError::Shape(_))));
    }
}
