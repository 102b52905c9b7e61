use anyhow::Result;
use std::io::{self, BufRead, Write};

use sql_chat_agent::api::middleware::ErrorResponse;
use sql_chat_agent::models::{QueryRequest, QueryResponse};

const DEFAULT_API_URL: &str = "http://localhost:8000/query";

/// Interactive console client for the SQL chat agent service: one prompt,
/// one POST, one rendered answer per iteration.
#[tokio::main]
async fn main() -> Result<()> {
    let api_url =
        std::env::var("SQL_CHAT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let client = reqwest::Client::new();

    print_banner("Welcome to the SQL Chat Agent!");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Enter your query (or type 'exit' to quit): ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break, // stdin closed
        };
        let query = line.trim();

        if is_exit_command(query) {
            println!("Goodbye!");
            return Ok(());
        }

        println!("\nSending query...");
        match send_query(&client, &api_url, query).await {
            Ok(result) => print_panel("Query Result", &result),
            Err(message) => print_panel("Error", &message),
        }
        println!();
    }

    println!("Goodbye!");
    Ok(())
}

/// Send a query to the service; the Err carries a display-ready message so
/// the loop never terminates on a failed request.
async fn send_query(
    client: &reqwest::Client,
    api_url: &str,
    query: &str,
) -> Result<String, String> {
    let payload = QueryRequest {
        query: query.to_string(),
        db_uri: None,
    };

    let response = client
        .post(api_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| format!("Could not reach the service: {}", e))?;

    let status = response.status();
    if status.is_success() {
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| format!("Malformed response from the service: {}", e))?;
        Ok(body.result)
    } else {
        let detail = match response.json::<ErrorResponse>().await {
            Ok(body) => body.detail,
            Err(_) => "no detail provided".to_string(),
        };
        Err(format!("Service returned {}: {}", status, detail))
    }
}

/// `exit` and `quit` end the loop, case-insensitively, without any HTTP call.
fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn print_banner(text: &str) {
    println!("{}", "=".repeat(text.len() + 4));
    println!("| {} |", text);
    println!("{}", "=".repeat(text.len() + 4));
}

fn print_panel(title: &str, body: &str) {
    println!("--- {} ---", title);
    println!("{}", body);
    println!("{}", "-".repeat(title.len() + 8));
}
