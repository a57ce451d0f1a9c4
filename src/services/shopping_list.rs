//! Shopping list
//!
//! Reduces every ingredient row of every recipe in a user's cart to one line
//! per (name, measurement unit) with the amounts summed. Two distinct
//! ingredient records that share name and unit end up on the same line.

use crate::db::repositories::RelationRepository;
use crate::models::{CartIngredient, User};
use anyhow::Context;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One line of the shopping list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

impl fmt::Display for ShoppingListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) — {}", self.name, self.measurement_unit, self.total)
    }
}

/// Error types for shopping list operations
#[derive(Debug, thiserror::Error)]
pub enum ShoppingListError {
    /// A line total does not fit in an i64
    #[error("Total amount of {name} ({unit}) is too large")]
    Overflow { name: String, unit: String },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Group rows by (name, unit), keeping the order in which each key first
/// appears.
pub fn aggregate(
    rows: impl IntoIterator<Item = CartIngredient>,
) -> Result<Vec<ShoppingListLine>, ShoppingListError> {
    let mut lines: Vec<ShoppingListLine> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let key = (row.name, row.measurement_unit);
        match index.get(&key) {
            Some(&pos) => {
                let line = &mut lines[pos];
                line.total = line.total.checked_add(row.amount).ok_or_else(|| {
                    ShoppingListError::Overflow {
                        name: line.name.clone(),
                        unit: line.measurement_unit.clone(),
                    }
                })?;
            }
            None => {
                index.insert(key.clone(), lines.len());
                lines.push(ShoppingListLine {
                    name: key.0,
                    measurement_unit: key.1,
                    total: row.amount,
                });
            }
        }
    }

    Ok(lines)
}

/// Lines joined with `\n`, no trailing newline. An empty list renders as an
/// empty string.
pub fn render(lines: &[ShoppingListLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds shopping lists from the store
pub struct ShoppingListService {
    relation_repo: Arc<dyn RelationRepository>,
}

impl ShoppingListService {
    pub fn new(relation_repo: Arc<dyn RelationRepository>) -> Self {
        Self { relation_repo }
    }

    /// Aggregated shopping list of `user`'s cart
    pub async fn build(&self, user: &User) -> Result<Vec<ShoppingListLine>, ShoppingListError> {
        let rows = self
            .relation_repo
            .cart_ingredients(user.id)
            .await
            .context("Failed to load shopping cart")?;
        aggregate(rows)
    }

    /// Rendered shopping list of `user`'s cart
    pub async fn download(&self, user: &User) -> Result<String, ShoppingListError> {
        let lines = self.build(user).await?;
        tracing::debug!(user_id = user.id, lines = lines.len(), "Shopping list built");
        Ok(render(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{RecipeRepository, SqlxRecipeRepository, SqlxRelationRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Collection, IngredientAmount, RecipeDraft, UserRole};
    use proptest::prelude::*;

    fn row(name: &str, unit: &str, amount: i64) -> CartIngredient {
        CartIngredient::new(name, unit, amount)
    }

    #[test]
    fn test_two_recipe_example() {
        let rows = vec![
            // recipe A
            row("Flour", "g", 200),
            row("Salt", "g", 5),
            // recipe B
            row("Flour", "g", 100),
            row("Sugar", "g", 50),
        ];
        let text = render(&aggregate(rows).unwrap());
        assert_eq!(text, "Flour (g) — 300\nSalt (g) — 5\nSugar (g) — 50");
    }

    #[test]
    fn test_unit_is_part_of_the_key() {
        let lines = aggregate(vec![
            row("Milk", "ml", 200),
            row("Milk", "cup", 1),
            row("Milk", "ml", 50),
        ])
        .unwrap();
        let line = |unit: &str, total| ShoppingListLine {
            name: "Milk".into(),
            measurement_unit: unit.into(),
            total,
        };
        assert_eq!(lines, vec![line("ml", 250), line("cup", 1)]);
    }

    #[test]
    fn test_empty_cart_renders_empty() {
        let lines = aggregate(Vec::new()).unwrap();
        assert!(lines.is_empty());
        assert_eq!(render(&lines), "");
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let err = aggregate(vec![row("Flour", "g", i64::MAX), row("Flour", "g", 1)]).unwrap_err();
        assert!(matches!(
            err,
            ShoppingListError::Overflow { ref name, ref unit } if name == "Flour" && unit == "g"
        ));

        // Large amounts on different keys never add up.
        let lines = aggregate(vec![row("Flour", "g", i64::MAX), row("Flour", "kg", 1)]).unwrap();
        assert_eq!(lines.len(), 2);
    }

    proptest! {
        #[test]
        fn aggregation_is_idempotent_and_conserves_totals(
            rows in prop::collection::vec((0usize..4, 0usize..2, 1i64..1000), 0..30)
        ) {
            let names = ["Flour", "Salt", "Sugar", "Яйцо"];
            let units = ["g", "pcs"];
            let rows: Vec<CartIngredient> = rows
                .into_iter()
                .map(|(n, u, a)| row(names[n], units[u], a))
                .collect();

            let first = render(&aggregate(rows.clone()).unwrap());
            let second = render(&aggregate(rows.clone()).unwrap());
            prop_assert_eq!(&first, &second);

            let lines = aggregate(rows.clone()).unwrap();
            let total: i64 = rows.iter().map(|r| r.amount).sum();
            prop_assert_eq!(lines.iter().map(|l| l.total).sum::<i64>(), total);

            let mut keys: Vec<(&str, &str)> = lines
                .iter()
                .map(|l| (l.name.as_str(), l.measurement_unit.as_str()))
                .collect();
            let count = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(keys.len(), count);
        }
    }

    #[tokio::test]
    async fn test_distinct_records_with_same_name_and_unit_merge() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap().clone();

        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash) \
             VALUES (1, 'u@example.com', 'u', 'U', 'U', 'h')",
        )
        .execute(&sqlite)
        .await
        .unwrap();
        sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (1, 'T', '#000000', 't')")
            .execute(&sqlite)
            .await
            .unwrap();
        for (id, name) in [(1, "Flour"), (2, "Flour"), (3, "Salt")] {
            sqlx::query("INSERT INTO ingredients (id, name, measurement_unit) VALUES (?, ?, 'g')")
                .bind(id)
                .bind(name)
                .execute(&sqlite)
                .await
                .unwrap();
        }

        let recipes = SqlxRecipeRepository::new(pool.clone());
        let draft = |ingredients: Vec<IngredientAmount>| RecipeDraft {
            name: "R".to_string(),
            image: "i".to_string(),
            text: "t".to_string(),
            cooking_time: 1,
            ingredients,
            tags: vec![1],
        };
        let a = recipes
            .create(1, &draft(vec![IngredientAmount::new(1, 200), IngredientAmount::new(3, 5)]))
            .await
            .unwrap();
        let b = recipes
            .create(1, &draft(vec![IngredientAmount::new(2, 100)]))
            .await
            .unwrap();

        let relations = SqlxRelationRepository::boxed(pool.clone());
        relations.add(Collection::ShoppingCart, 1, a.id).await.unwrap();
        relations.add(Collection::ShoppingCart, 1, b.id).await.unwrap();

        let user = User {
            id: 1,
            ..User::new(
                "u@example.com".into(),
                "u".into(),
                "U".into(),
                "U".into(),
                "h".into(),
                UserRole::User,
            )
        };
        let service = ShoppingListService::new(relations);
        let text = service.download(&user).await.unwrap();
        assert_eq!(text, "Flour (g) — 300\nSalt (g) — 5");
        assert_eq!(service.download(&user).await.unwrap(), text);
    }
}
