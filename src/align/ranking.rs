//! Tactical role ranking.
//!
//! Column blocks of the aligned matrix follow a canonical role order (back to
//! front, left to right). Vendors name roles differently, so each vocabulary
//! is a named scheme in a [`RankingRegistry`].

use std::collections::HashMap;

use crate::error::AlignError;
use crate::tracking::PlayerTrack;

/// Elaborate positioning scheme (DFL/Impire German role codes).
const SCHEME_A: &[(&str, u32)] = &[
    ("TW", 1),
    ("LV", 2),
    ("IVL", 3),
    ("IVZ", 4),
    ("IVR", 5),
    ("RV", 6),
    ("DML", 7),
    ("DMZ", 8),
    ("DMR", 9),
    ("LM", 10),
    ("HL", 11),
    ("MZ", 12),
    ("HR", 13),
    ("RM", 14),
    ("OLM", 15),
    ("ZO", 16),
    ("ORM", 17),
    ("HST", 18),
    ("LA", 19),
    ("STL", 20),
    ("STR", 21),
    ("RA", 22),
    ("STZ", 23),
];

/// Simple line scheme.
const SCHEME_B: &[(&str, u32)] = &[("G", 1), ("D", 2), ("M", 3), ("A", 4)];

/// Amisco scheme.
const SCHEME_C: &[(&str, u32)] = &[
    ("goalie", 1),
    ("defenseman", 2),
    ("mid-fielder", 3),
    ("forward", 4),
];

/// Anything carrying an entity id and a role label.
pub trait Ranked {
    fn entity_id(&self) -> &str;
    fn role(&self) -> &str;
}

impl Ranked for PlayerTrack {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> &str {
        &self.role
    }
}

/// Immutable mapping of scheme id → (role label → rank).
#[derive(Debug, Clone, Default)]
pub struct RankingRegistry {
    schemes: HashMap<String, HashMap<String, u32>>,
}

impl RankingRegistry {
    /// Registry holding the built-in schemes "A", "B" and "C".
    pub fn builtin() -> Self {
        RankingRegistry::default()
            .with_scheme("A", SCHEME_A.iter().copied())
            .with_scheme("B", SCHEME_B.iter().copied())
            .with_scheme("C", SCHEME_C.iter().copied())
    }

    pub fn with_scheme<'a, I>(mut self, id: &str, ranks: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let table = ranks
            .into_iter()
            .map(|(role, rank)| (role.to_string(), rank))
            .collect();
        self.schemes.insert(id.to_string(), table);
        self
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.schemes.contains_key(scheme)
    }

    pub fn scheme_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn rank(&self, scheme: &str, role: &str) -> Option<u32> {
        self.schemes.get(scheme)?.get(role).copied()
    }

    /// Order `entities` by ascending rank of their role.
    ///
    /// The sort is stable, so entities sharing a rank keep their input order.
    /// Fails on the first entity whose role the scheme does not know (an
    /// unknown scheme fails the same way for any entity).
    pub fn sort_by_role<'e, T: Ranked>(
        &self,
        entities: &'e [T],
        scheme: &str,
    ) -> Result<Vec<&'e T>, AlignError> {
        let mut keyed = entities
            .iter()
            .map(|e| {
                self.rank(scheme, e.role())
                    .map(|rank| (rank, e))
                    .ok_or_else(|| AlignError::RoleLookupFailure {
                        entity_id: e.entity_id().to_string(),
                        role: e.role().to_string(),
                        scheme: scheme.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        keyed.sort_by_key(|(rank, _)| *rank);
        Ok(keyed.into_iter().map(|(_, e)| e).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Entity(&'static str, &'static str);

    impl Ranked for Entity {
        fn entity_id(&self) -> &str {
            self.0
        }
        fn role(&self) -> &str {
            self.1
        }
    }

    fn roles(sorted: &[&Entity]) -> Vec<&'static str> {
        sorted.iter().map(|e| e.1).collect()
    }

    #[test]
    fn scheme_a_orders_back_to_front() {
        let reg = RankingRegistry::builtin();
        let players = [Entity("p1", "STZ"), Entity("p2", "DMZ"), Entity("p3", "LM")];
        let sorted = reg.sort_by_role(&players, "A").unwrap();
        assert_eq!(roles(&sorted), vec!["DMZ", "LM", "STZ"]);
    }

    #[test]
    fn schemes_b_and_c() {
        let reg = RankingRegistry::builtin();
        let b = [Entity("1", "A"), Entity("2", "M"), Entity("3", "G"), Entity("4", "D")];
        assert_eq!(roles(&reg.sort_by_role(&b, "B").unwrap()), vec!["G", "D", "M", "A"]);

        let c = [
            Entity("1", "forward"),
            Entity("2", "goalie"),
            Entity("3", "mid-fielder"),
            Entity("4", "defenseman"),
        ];
        assert_eq!(
            roles(&reg.sort_by_role(&c, "C").unwrap()),
            vec!["goalie", "defenseman", "mid-fielder", "forward"]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let reg = RankingRegistry::builtin();
        let players = [Entity("x", "M"), Entity("y", "D"), Entity("z", "M")];
        let sorted = reg.sort_by_role(&players, "B").unwrap();
        let ids: Vec<&str> = sorted.iter().map(|e| e.0).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn unknown_role_names_entity() {
        let reg = RankingRegistry::builtin();
        let players = [Entity("p1", "TW"), Entity("p9", "XYZ")];
        let err = reg.sort_by_role(&players, "A").unwrap_err();
        assert_eq!(
            err,
            AlignError::RoleLookupFailure {
                entity_id: "p9".into(),
                role: "XYZ".into(),
                scheme: "A".into(),
            }
        );
    }

    #[test]
    fn custom_scheme_can_be_added() {
        let reg = RankingRegistry::builtin().with_scheme("opta", [("GK", 1), ("FW", 2)]);
        assert!(reg.contains("opta"));
        assert_eq!(reg.rank("opta", "FW"), Some(2));
        assert_eq!(reg.scheme_ids(), vec!["A", "B", "C", "opta"]);
    }
}
