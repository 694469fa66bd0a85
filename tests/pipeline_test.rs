use anyhow::Result;
use relay_etl::core::Relay;
use relay_etl::{EtlEngine, EtlError, LocalStorage, MemoryRelay, RelayPipeline, TomlConfig};
use tempfile::TempDir;
use uuid::Uuid;

fn location_config(temp_path: &str) -> String {
    format!(
        r#"
[pipeline]
name = "library-locations"
description = "End-to-end location reshape test"
version = "1.0.0"

[source]
input_path = "{base}/locations.json"
subset = "locations"

[reshape]
header = "name,lat,lon,processing_date"
rename_from = "full_name"
rename_to = "name"
split_from = "coord"
split_to = "lat,lon"
splitter = ","

[relay]
backend = "memory"
channel = "library-data"
consume_timeout_ms = 1000

[load]
output_path = "{base}/locations.csv"
"#,
        base = temp_path
    )
}

fn build_engine(
    config: relay_etl::EtlConfig,
) -> EtlEngine<RelayPipeline<LocalStorage, relay_etl::EtlConfig>> {
    let relay: Box<dyn Relay> = Box::new(MemoryRelay::new(config.channel.clone()));
    let storage = LocalStorage::new(String::new());
    EtlEngine::new(RelayPipeline::new(storage, config, relay))
}

#[tokio::test]
async fn test_end_to_end_location_relay() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    std::fs::write(
        format!("{}/locations.json", temp_path),
        r#"{"locations": [
            {"full_name": "Jane Doe", "coord": "10,20", "comment": "dropped"},
            {"full_name": "John Roe", "coord": "30,40"}
        ]}"#,
    )?;

    let config = TomlConfig::from_toml_str(&location_config(&temp_path))?.resolve()?;
    let engine = build_engine(config);

    let output_path = engine.run().await?;
    assert_eq!(output_path, format!("{}/locations.csv", temp_path));

    let content = std::fs::read_to_string(&output_path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "name,lat,lon,processing_date,messageid");

    let today = chrono::Local::now().format("%d-%m-%Y").to_string();
    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(&first[..4], &["Jane Doe", "10", "20", today.as_str()]);
    let second: Vec<&str> = lines[2].split(',').collect();
    assert_eq!(&second[..4], &["John Roe", "30", "40", today.as_str()]);

    // Trailing column is the correlation identifier, unique per record.
    let first_id = Uuid::parse_str(first[4])?;
    let second_id = Uuid::parse_str(second[4])?;
    assert_ne!(first_id, second_id);

    Ok(())
}

#[tokio::test]
async fn test_end_to_end_with_rowkey_and_whitespace_split() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    std::fs::write(
        format!("{}/branches.json", temp_path),
        r#"[
            {"branch": {"contact": "Jane  Doe", "city": "Wellington"}},
            {"branch": {"contact": "John Roe", "city": "Auckland"}}
        ]"#,
    )?;

    let config_content = format!(
        r#"
[pipeline]
name = "branches"
description = "rowkey descent with whitespace splitting"
version = "1.0.0"

[source]
input_path = "{base}/branches.json"
rowkey = "branch"

[reshape]
header = "first,last,city,processing_date"
split_from = "contact"
split_to = "first,last"
splitter = ""

[relay]
backend = "memory"
channel = "branches"

[load]
output_path = "{base}/branches.csv"
"#,
        base = temp_path
    );

    let config = TomlConfig::from_toml_str(&config_content)?.resolve()?;
    let engine = build_engine(config);
    engine.run().await?;

    let content = std::fs::read_to_string(format!("{}/branches.csv", temp_path))?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "first,last,city,processing_date,messageid");
    assert!(lines[1].starts_with("Jane,Doe,Wellington,"));
    assert!(lines[2].starts_with("John,Roe,Auckland,"));

    Ok(())
}

#[tokio::test]
async fn test_run_halts_on_first_bad_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    // The second record lacks the rename source; the run aborts there and
    // no output file is produced.
    std::fs::write(
        format!("{}/locations.json", temp_path),
        r#"{"locations": [
            {"full_name": "Jane Doe", "coord": "10,20"},
            {"coord": "30,40"}
        ]}"#,
    )?;

    let config = TomlConfig::from_toml_str(&location_config(&temp_path))?.resolve()?;
    let engine = build_engine(config);

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, EtlError::MissingFieldError { field } if field == "full_name"));
    assert!(!std::path::Path::new(&format!("{}/locations.csv", temp_path)).exists());

    Ok(())
}
