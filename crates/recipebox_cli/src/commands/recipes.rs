//! Recipe commands: list, show, add, update, delete.

use super::{print_json, CliError, CommandResult, Format, StoreArgs};
use recipebox_core::{
    Recipe, RecipeDraft, RecipeId, RecipePatch, Repository, SearchParams, SortBy, SortOrder,
};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Builds search parameters from the `list` flags.
pub fn search_params(
    query: Option<String>,
    tags: Vec<String>,
    ingredients: Vec<String>,
    min_rating: Option<u8>,
    sort_by: SortBy,
    order: SortOrder,
) -> SearchParams {
    SearchParams {
        query,
        tags,
        ingredients,
        min_rating,
        sort_by,
        sort_order: order,
    }
}

/// Lists matching recipes.
pub fn list(store: &StoreArgs, params: &SearchParams, format: Format) -> CommandResult {
    let repo = Repository::new(store.open("list")?);
    let recipes = repo.search(params)?;

    match format {
        Format::Json => print_json(&recipes)?,
        Format::Text => {
            for recipe in &recipes {
                println!("{}", summary_line(recipe));
            }
            println!();
            println!("{} recipe(s)", recipes.len());
        }
    }
    Ok(())
}

/// Prints one recipe.
pub fn show(store: &StoreArgs, id: &str, format: Format) -> CommandResult {
    let repo = Repository::new(store.open("show")?);
    let id = RecipeId::from(id);
    let recipe = repo.get_by_id(&id)?.ok_or(CliError::NotFound(id))?;

    match format {
        Format::Json => print_json(&recipe)?,
        Format::Text => render(&recipe, &mut io::stdout().lock())?,
    }
    Ok(())
}

/// Validates and stores a recipe form read from `file`.
pub fn add(store: &StoreArgs, file: &Path) -> CommandResult {
    let draft: RecipeDraft = serde_json::from_str(&fs::read_to_string(file)?)?;
    check_form(&draft)?;

    let repo = Repository::new(store.open("add")?);
    let recipe = repo.create(draft)?;

    println!("✓ Recipe created");
    println!("  Id: {}", recipe.id);
    println!("  Title: {}", recipe.title);
    Ok(())
}

/// Applies the fields in `file` to a stored recipe.
///
/// The merged recipe must still pass form validation.
pub fn update(store: &StoreArgs, id: &str, file: &Path) -> CommandResult {
    let patch: RecipePatch = serde_json::from_str(&fs::read_to_string(file)?)?;
    let repo = Repository::new(store.open("update")?);
    let id = RecipeId::from(id);

    let mut preview = repo
        .get_by_id(&id)?
        .ok_or_else(|| CliError::NotFound(id.clone()))?;
    let stamp = preview.updated_at.clone();
    preview.apply(patch.clone(), &stamp);
    check_form(&as_draft(preview))?;

    let updated = repo.update(&id, patch)?.ok_or(CliError::NotFound(id))?;
    info!(id = %updated.id, "recipe updated from {:?}", file);
    println!("✓ Recipe updated");
    println!("  Updated at: {}", updated.updated_at);
    Ok(())
}

/// Deletes a recipe.
pub fn delete(store: &StoreArgs, id: &str) -> CommandResult {
    let repo = Repository::new(store.open("delete")?);
    let id = RecipeId::from(id);
    if repo.delete(&id)? {
        println!("✓ Recipe {id} deleted");
        Ok(())
    } else {
        Err(CliError::NotFound(id).into())
    }
}

fn check_form(draft: &RecipeDraft) -> Result<(), CliError> {
    let errors = draft.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    Err(CliError::InvalidForm(lines.join("\n")))
}

fn as_draft(recipe: Recipe) -> RecipeDraft {
    RecipeDraft {
        title: recipe.title,
        description: recipe.description,
        photos: recipe.photos,
        servings: recipe.servings,
        prep_time: recipe.prep_time,
        cook_time: recipe.cook_time,
        ingredients: recipe.ingredients,
        steps: recipe.steps,
        notes: recipe.notes,
        tags: recipe.tags,
        rating: recipe.rating,
    }
}

fn stars(rating: Option<u8>) -> String {
    match rating {
        Some(n) if n > 0 => "★".repeat(usize::from(n)),
        _ => "unrated".to_string(),
    }
}

fn summary_line(recipe: &Recipe) -> String {
    let line = format!("{}  {}  [{}]", recipe.id, recipe.title, stars(recipe.rating));
    if recipe.tags.is_empty() {
        line
    } else {
        format!("{line}  #{}", recipe.tags.join(" #"))
    }
}

fn render(recipe: &Recipe, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", recipe.title)?;
    writeln!(out, "{}", "=".repeat(recipe.title.chars().count()))?;
    if let Some(description) = &recipe.description {
        writeln!(out, "{description}")?;
    }
    writeln!(out)?;
    writeln!(out, "Id:       {}", recipe.id)?;
    writeln!(out, "Rating:   {}", stars(recipe.rating))?;
    writeln!(out, "Servings: {}", recipe.servings)?;
    if let Some(prep) = recipe.prep_time {
        writeln!(out, "Prep:     {prep} min")?;
    }
    if let Some(cook) = recipe.cook_time {
        writeln!(out, "Cook:     {cook} min")?;
    }
    if !recipe.tags.is_empty() {
        writeln!(out, "Tags:     {}", recipe.tags.join(", "))?;
    }
    if !recipe.photos.is_empty() {
        writeln!(out, "Photos:   {}", recipe.photos.len())?;
    }

    writeln!(out, "\nIngredients:")?;
    for ingredient in &recipe.ingredients {
        let amount = match (ingredient.quantity, ingredient.unit.as_deref()) {
            (Some(q), Some(u)) => format!("{q} {u} "),
            (Some(q), None) => format!("{q} "),
            (None, Some(u)) => format!("{u} "),
            (None, None) => String::new(),
        };
        writeln!(out, "  - {amount}{}", ingredient.name)?;
    }

    writeln!(out, "\nSteps:")?;
    for (n, step) in recipe.steps.iter().enumerate() {
        writeln!(out, "  {}. {step}", n + 1)?;
    }

    if let Some(notes) = &recipe.notes {
        writeln!(out, "\nNotes:\n{notes}")?;
    }
    writeln!(out, "\nCreated {}, updated {}", recipe.created_at, recipe.updated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipebox_core::Ingredient;

    fn recipe() -> Recipe {
        let draft = RecipeDraft::new("Pancakes")
            .ingredient(Ingredient::named("Flour").with_amount(1.5, Some("cups")))
            .ingredient(Ingredient::named("Egg").with_amount(2.0, None))
            .ingredient(Ingredient::named("Salt"))
            .step("Mix")
            .step("Fry")
            .tag("breakfast")
            .tag("sweet")
            .rating(4);
        Recipe::from_draft(RecipeId::from("p1"), draft, "2024-01-01T00:00:00.000Z")
    }

    #[test]
    fn summary_shows_stars_and_tags() {
        assert_eq!(
            summary_line(&recipe()),
            "p1  Pancakes  [★★★★]  #breakfast #sweet"
        );
    }

    #[test]
    fn unrated_summary() {
        let mut r = recipe();
        r.rating = None;
        r.tags.clear();
        assert_eq!(summary_line(&r), "p1  Pancakes  [unrated]");
    }

    #[test]
    fn render_lists_ingredients_and_numbered_steps() {
        let mut out = Vec::new();
        render(&recipe(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Pancakes\n========\n"));
        assert!(text.contains("  - 1.5 cups Flour\n"));
        assert!(text.contains("  - 2 Egg\n"));
        assert!(text.contains("  - Salt\n"));
        assert!(text.contains("  1. Mix\n  2. Fry\n"));
    }

    #[test]
    fn invalid_form_lists_every_problem() {
        let err = check_form(&RecipeDraft::new("")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("title: Title is required"));
        assert!(message.contains("steps: At least one step is required"));
    }

    #[test]
    fn search_params_carry_flags() {
        let params = search_params(
            Some("soup".into()),
            vec!["a".into()],
            vec![],
            Some(3),
            SortBy::Title,
            SortOrder::Asc,
        );
        let expected = SearchParams::new()
            .query("soup")
            .tag("a")
            .min_rating(3)
            .sort(SortBy::Title, SortOrder::Asc);
        assert_eq!(params, expected);
    }
}
