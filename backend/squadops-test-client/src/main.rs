// src/main.rs

use std::error::Error;

use reqwest::Client;
use serde::Deserialize;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct AttendanceCounts {
    total: usize,
    present: usize,
    absent: usize,
    justified: usize,
    percentage: u32,
}

#[derive(Debug, Deserialize)]
struct PersonnelRow {
    id: String,
    rank: String,
    name: String,
    seniority: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = "http://localhost:3000";
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;

    println!(
        "Health check response: status={}, timestamp={}",
        health_response.status, health_response.timestamp
    );

    // Test 2: Personnel roster
    println!("\n🔍 Testing personnel roster...");
    let roster_response = client
        .get(format!("{}/api/personnel", base_url))
        .send()
        .await?;

    println!("Roster status: {}", roster_response.status());
    if roster_response.status().is_success() {
        let roster = roster_response.json::<Vec<PersonnelRow>>().await?;
        println!("Roster has {} members:", roster.len());
        for member in roster.iter().take(10) {
            println!(
                " - [{}] {} {} (seniority: {:?})",
                member.id, member.rank, member.name, member.seniority
            );
        }
    } else {
        println!("Failed to fetch roster: {}", roster_response.text().await?);
    }

    // Test 3: Attendance dashboard counts
    println!("\n🔍 Testing attendance dashboard...");
    let dashboard_response = client
        .get(format!("{}/api/dashboard/attendance", base_url))
        .send()
        .await?;

    println!("Dashboard status: {}", dashboard_response.status());
    if dashboard_response.status().is_success() {
        let counts = dashboard_response.json::<AttendanceCounts>().await?;
        println!(
            "Attendance today: total={}, present={}, absent={}, justified={}, percentage={}%",
            counts.total, counts.present, counts.absent, counts.justified, counts.percentage
        );
    } else {
        println!(
            "Failed to fetch dashboard: {}",
            dashboard_response.text().await?
        );
    }

    // Test 4: Remaining dashboard domains
    println!("\n🔍 Testing remaining dashboard endpoints...");
    for domain in [
        "flights",
        "events",
        "justifications",
        "keys",
        "notes",
        "permanence",
        "cleaning",
        "ti-tickets",
    ] {
        let response = client
            .get(format!("{}/api/dashboard/{}", base_url, domain))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        println!(" - {}: {} {}", domain, status, body);
    }

    // Test 5: Attendance report PDF
    println!("\n🔍 Testing attendance report generation...");
    let report_response = client
        .get(format!(
            "{}/api/reports/attendance?date=2024-01-10&call_type=alvorada",
            base_url
        ))
        .send()
        .await?;

    println!("Report status: {}", report_response.status());
    if report_response.status().is_success() {
        let bytes = report_response.bytes().await?;
        println!(
            "Report PDF received: {} bytes (starts with %PDF: {})",
            bytes.len(),
            bytes.starts_with(b"%PDF")
        );
    } else {
        println!("Failed to generate report: {}", report_response.text().await?);
    }

    // Test 6: Validation errors are rejected before any remote call
    println!("\n🔍 Testing validation rejection...");
    let invalid = client
        .post(format!("{}/api/justifications", base_url))
        .json(&serde_json::json!({
            "military_id": "m1",
            "military_name": "FULANO",
            "reason": "teste",
            "start_date": "2024-02-10",
            "end_date": "2024-02-01"
        }))
        .send()
        .await?;
    println!(
        "Inverted date range rejected with status {}: {}",
        invalid.status(),
        invalid.text().await?
    );

    println!("\n✅ Testing complete!");

    Ok(())
}
