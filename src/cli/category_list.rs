use crate::core::categories::CATEGORIES;

pub fn list_categories() {
    println!("Available categories:\n");
    println!("{:<12} {:<22} DESCRIPTION", "CATEGORY", "MODEL");
    for category in CATEGORIES {
        println!(
            "{:<12} {:<22} {}",
            category.slug, category.model, category.description
        );
    }
    println!("\nStart one with: ultron -c <category>");
}
