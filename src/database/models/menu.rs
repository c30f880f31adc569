use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::account::{DbId, SchoolId};

/// Allergy codes printed next to school meal items (1..=18)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergy {
    Eggs,
    Milk,
    Buckwheat,
    Peanut,
    Soybean,
    Wheat,
    Mackerel,
    Crab,
    Shrimp,
    Pork,
    Peach,
    Tomato,
    Sulfites,
    Walnut,
    Chicken,
    Beef,
    Squid,
    Shellfish,
}

impl Allergy {
    pub const ALL: [Allergy; 18] = [
        Allergy::Eggs,
        Allergy::Milk,
        Allergy::Buckwheat,
        Allergy::Peanut,
        Allergy::Soybean,
        Allergy::Wheat,
        Allergy::Mackerel,
        Allergy::Crab,
        Allergy::Shrimp,
        Allergy::Pork,
        Allergy::Peach,
        Allergy::Tomato,
        Allergy::Sulfites,
        Allergy::Walnut,
        Allergy::Chicken,
        Allergy::Beef,
        Allergy::Squid,
        Allergy::Shellfish,
    ];

    pub fn code(self) -> i16 {
        Self::ALL.iter().position(|a| *a == self).map(|i| i as i16 + 1).unwrap_or(0)
    }

    pub fn from_code(code: i16) -> Option<Self> {
        if code < 1 {
            return None;
        }
        Self::ALL.get(code as usize - 1).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CafeteriaMenu {
    #[serde(default)]
    pub id: DbId,
    pub school_id: SchoolId,
    pub meal_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub items: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MenuEntry {
    pub name: String,
    /// Raw allergy codes, checked against [`Allergy`] during validation
    #[serde(rename = "allergy", default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<i16>,
    #[serde(default)]
    pub contents: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct MenuRow {
    pub id: DbId,
    pub school_id: SchoolId,
    pub meal_name: String,
    pub date: NaiveDate,
}

impl MenuRow {
    pub fn with_items(self, items: Vec<MenuEntry>) -> CafeteriaMenu {
        CafeteriaMenu {
            id: self.id,
            school_id: self.school_id,
            meal_name: self.meal_name,
            date: self.date,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allergy_table_spans_one_to_eighteen() {
        assert_eq!(Allergy::from_code(1), Some(Allergy::Eggs));
        assert_eq!(Allergy::from_code(18), Some(Allergy::Shellfish));
        assert_eq!(Allergy::from_code(0), None);
        assert_eq!(Allergy::from_code(19), None);
        assert_eq!(Allergy::from_code(-3), None);
        assert_eq!(Allergy::Pork.code(), 10);
    }

    #[test]
    fn menu_entry_uses_allergy_key() {
        let entry: MenuEntry =
            serde_json::from_str(r#"{"name":"bibimbap","allergy":[1,5,6],"contents":"rice"}"#).unwrap();
        assert_eq!(entry.allergies, vec![1, 5, 6]);

        let plain = MenuEntry {
            name: "rice".to_string(),
            allergies: vec![],
            contents: String::new(),
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("allergy").is_none());
    }
}
