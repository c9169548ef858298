use std::error::Error;

use crate::api::UltronClient;

pub async fn list_recent(base_url: String) -> Result<(), Box<dyn Error>> {
    let client = UltronClient::new(base_url);
    let recent = client.recent_chats().await?;

    if recent.is_empty() {
        println!("No recent conversations.");
        return Ok(());
    }

    println!("Recent conversations:\n");
    for chat in recent {
        let category = chat.category.as_deref().unwrap_or("-");
        println!("{:<10} {:<24} {}", category, chat.chat_name, chat.created_at);
        if let Some(last) = chat.last_message.as_deref() {
            if !last.is_empty() {
                println!("           {last}");
            }
        }
    }

    Ok(())
}
