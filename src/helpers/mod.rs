pub mod download;

use anyhow::{Result, bail};
use termenu::{Item, Menu};

/// Terminal picker shared by every prompt in the wizard. Items are converted
/// to `String`s so callers do not have to worry about ownership.
pub fn choose_one<S: ToString>(title: &str, items: Vec<S>) -> Result<String> {
    let display_items: Vec<String> = items.into_iter().map(|s| s.to_string()).collect();
    if display_items.is_empty() {
        bail!("nothing to choose from");
    }

    let mut menu = Menu::new()?;
    let list: Vec<Item<usize>> = display_items
        .iter()
        .enumerate()
        .map(|(idx, label)| Item::new(label, idx))
        .collect();

    match menu.set_title(title).add_list(list).select()? {
        Some(&idx) => Ok(display_items[idx].clone()),
        None => bail!("no selection made"),
    }
}

/// Yes/no prompt built on the same picker.
pub fn confirm(question: &str) -> Result<bool> {
    Ok(choose_one(question, vec!["Yes", "No"])? == "Yes")
}
