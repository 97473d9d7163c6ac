use anyhow::Result;
use player_scraper::exporter::load_json;
use player_scraper::{
    roster, Config, ExportFormat, FieldValue, HttpFetcher, Pipeline, PlayerStore, ProfileParser,
};
use std::fs;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile_page(name: &str, score: &str, rank: &str) -> String {
    format!(
        r#"<html><body>
            <section class="profile">
              <h1 class="name">{name}</h1>
              <ul id="stats">
                <li class="score">{score}</li>
                <li class="rank">{rank}</li>
              </ul>
            </section>
        </body></html>"#
    )
}

fn config_for(server: &MockServer, data_dir: &std::path::Path) -> Result<Config> {
    let toml = format!(
        r##"
[site]
profile_url = "{uri}/profile/{{player}}"
online_url = "{uri}/general/online"
timeout_seconds = 2

[limits]
requests_per_min = 600
delay_ms = 0
max_retries = 1
retry_delay_ms = 1

[storage]
output_dir = "{dir}/output"
store_file = "{dir}/players_db.json"
roster_file = "{dir}/online_db.json"

[[fields]]
name = "username"
selector = ".profile h1.name"

[[fields]]
name = "score"
selector = "#stats .score"
kind = "integer"

[[fields]]
name = "rank"
selector = "#stats .rank"
"##,
        uri = server.uri(),
        dir = data_dir.display()
    );
    let config = Config::from_toml(&toml)?;
    config.validate()?;
    Ok(config)
}

async fn mount_profiles(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/profile/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_page("Alice", "1,200", "Gold")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_page("Bob", "950", "Silver")))
        .mount(server)
        .await;
    // layout changed for this player
    Mock::given(method("GET"))
        .and(path("/profile/carol"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><div>Carol</div></body></html>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scrape_and_export_csv_and_json() -> Result<()> {
    let server = MockServer::start().await;
    mount_profiles(&server).await;
    let dir = tempdir()?;
    let config = config_for(&server, dir.path())?;

    let pipeline = Pipeline::new(
        Box::new(HttpFetcher::from_config(&config)?),
        ProfileParser::new(&config.fields)?,
        config.site.profile_url.clone(),
    );
    let players = vec!["alice".to_string(), "bob".into(), "carol".into(), "nobody".into()];
    let (exporter, result) = pipeline.run(&players).await?;

    assert_eq!(result.total, 4);
    assert_eq!(result.processed, 2);
    let failed: Vec<&str> = result.failed.iter().map(|f| f.player.as_str()).collect();
    assert_eq!(failed, vec!["carol", "nobody"]);

    let csv_path = dir.path().join("output/players.csv");
    exporter.export(&csv_path, ExportFormat::Csv)?;
    let csv = fs::read_to_string(&csv_path)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "player,username,score,rank,source");
    assert_eq!(
        lines[1],
        format!("alice,Alice,1200,Gold,{}/profile/alice", server.uri())
    );
    assert_eq!(lines.len(), 3);

    let json_path = dir.path().join("output/players.json");
    exporter.export(&json_path, ExportFormat::Json)?;
    let loaded = load_json(&json_path)?;
    assert_eq!(loaded, exporter.records());
    assert_eq!(loaded[1].get("score"), Some(&FieldValue::Integer(950)));

    Ok(())
}

#[tokio::test]
async fn test_online_roster_feeds_store() -> Result<()> {
    let server = MockServer::start().await;
    mount_profiles(&server).await;
    Mock::given(method("GET"))
        .and(path("/general/online"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"users":[{"name":"alice"},{"name":"bob"}]}"#),
        )
        .mount(&server)
        .await;

    let dir = tempdir()?;
    let config = config_for(&server, dir.path())?;
    let fetcher = HttpFetcher::from_config(&config)?;

    let online_url = config.site.online_url.clone().unwrap_or_default();
    let roster_path = std::path::PathBuf::from(&config.storage.roster_file);
    let names = roster::refresh(&fetcher, &online_url, &roster_path).await?;
    assert_eq!(names, vec!["alice", "bob"]);

    let pipeline = Pipeline::new(
        Box::new(fetcher),
        ProfileParser::new(&config.fields)?,
        config.site.profile_url.clone(),
    );
    let (exporter, result) = pipeline.run(&names).await?;
    assert!(result.failed.is_empty());

    let mut store = PlayerStore::open(&config.storage.store_file);
    for record in exporter.records() {
        store.upsert(record.clone());
    }
    store.save()?;

    let reopened = PlayerStore::open(&config.storage.store_file);
    assert_eq!(reopened.len(), 2);
    let silver: Vec<&str> = reopened
        .find_by_field("rank", "Silver")
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(silver, vec!["bob"]);
    assert_eq!(reopened.find_by_field("score", "1200").len(), 1);

    Ok(())
}
