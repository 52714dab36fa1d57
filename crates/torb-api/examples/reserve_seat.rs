// Example: Reserve and cancel a seat via the API
// Run with: cargo run -p torb-api --example reserve_seat
//
// Prerequisites:
// 1. Start the API: cargo run -p torb-api (no DATABASE_URL needed for dev mode)
// 2. Create a public event, e.g. via POST /admin/api/events with
//    ADMIN_LOGIN_NAME / ADMIN_PASSWORD set on the server

use serde_json::{json, Value};

const API_BASE_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let login = format!("example-{}", chrono::Utc::now().timestamp());

    // Step 1: Register and log in
    println!("Registering {}...", login);
    let register = client
        .post(format!("{}/api/users", API_BASE_URL))
        .json(&json!({"nickname": "Example", "login_name": login, "password": "example"}))
        .send()
        .await?;
    if !register.status().is_success() {
        eprintln!("Failed to register: {}", register.status());
        eprintln!("Response: {}", register.text().await?);
        return Ok(());
    }
    let user: Value = register.json().await?;

    let response = client
        .post(format!("{}/api/actions/login", API_BASE_URL))
        .json(&json!({"login_name": login, "password": "example"}))
        .send()
        .await?;
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
        .ok_or("login did not set a session cookie")?;
    println!("Logged in as user {}", user["id"]);

    // Step 2: Pick a public event
    let events: Vec<Value> = client
        .get(format!("{}/api/events", API_BASE_URL))
        .send()
        .await?
        .json()
        .await?;
    let Some(event) = events.first() else {
        println!("No public events yet; create one as an administrator first.");
        return Ok(());
    };
    println!(
        "Event {} \"{}\": {}/{} seats left",
        event["id"], event["title"], event["remains"], event["total"]
    );

    // Step 3: Reserve a seat
    let response = client
        .post(format!(
            "{}/api/events/{}/actions/reserve",
            API_BASE_URL, event["id"]
        ))
        .header(reqwest::header::COOKIE, &cookie)
        .json(&json!({"sheet_rank": "S"}))
        .send()
        .await?;
    let status = response.status();
    let seat: Value = response.json().await?;
    if !status.is_success() {
        println!("Reservation failed ({}): {}", status, seat["error"]);
        return Ok(());
    }
    println!("Reserved {}-{}", seat["sheet_rank"], seat["sheet_num"]);

    // Step 4: Look at the dashboard
    let dashboard: Value = client
        .get(format!("{}/api/users/{}", API_BASE_URL, user["id"]))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await?
        .json()
        .await?;
    println!("Total spent: {}", dashboard["total_price"]);

    // Step 5: Cancel it again
    let response = client
        .delete(format!(
            "{}/api/events/{}/sheets/{}/{}/reservation",
            API_BASE_URL,
            event["id"],
            seat["sheet_rank"].as_str().unwrap_or("S"),
            seat["sheet_num"]
        ))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await?;
    println!("Cancel: {}", response.status());

    Ok(())
}
