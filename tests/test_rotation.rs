use std::fs;
use std::path::Path;

use rolling_record_logger::{LogReader, Logger, LoggerConfig, RotationPolicy, Value};

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Cannot read {:?} due to {}", path, e))
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_rotation_keeps_at_most_max_files_backups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("log.csv");
    let logger = Logger::new(
        LoggerConfig::new(&path)
            .fmt("{timestamp},{severity},{message}")
            .custom_levels(["logs_a", "logs_b", "logs_c"])
            .max_size(1024)
            .max_files(4)
            .header(vec!["date", "level", "value_1", "value_2"]),
    )
    .unwrap_or_else(|e| panic!("Logger initialization failed with {}", e));

    for i in 0..10 {
        logger.log("logs_a", vec![i, i * 2]).unwrap();
    }
    logger
        .log("logs_b", vec![Value::from(1000.1), Value::from(2000.2)])
        .unwrap();
    logger.critical("3000,4000").unwrap();
    for i in 0..50 {
        logger
            .log("logs_c", vec![Value::from(i * 2), Value::from(f64::from(i * i))])
            .unwrap();
    }

    let policy = RotationPolicy::new(&path, 1024, 4);
    let backups = policy.backups().unwrap();
    assert!(!backups.is_empty());
    assert!(backups.len() <= 4);
    for (index, backup) in &backups {
        assert!((1..=4).contains(index));
        assert_eq!(policy.backup_path(*index), *backup);
    }
    assert!(!policy.backup_path(5).exists());

    for file in backups.iter().map(|(_, p)| p.as_path()).chain([path.as_path()]) {
        let lines = read_lines(file);
        assert_eq!("date,level,value_1,value_2", lines[0]);
        assert!(fs::metadata(file).unwrap().len() <= 1024);
    }

    // 62件すべてが残っている（4つのバックアップに収まる量）
    let rows = logger.get_logs(false).unwrap();
    assert_eq!(62, rows.len());
    assert!(rows.iter().all(|row| row[0].to_string() != "date"));
    assert_eq!(vec!["LOGS_A", "0", "0"], rows[0].to_strings()[1..].to_vec());
    assert_eq!(
        vec!["LOGS_B", "1000.1", "2000.2"],
        rows[10].to_strings()[1..].to_vec()
    );
    assert_eq!(
        vec!["CRITICAL", "3000", "4000"],
        rows[11].to_strings()[1..].to_vec()
    );
    assert_eq!(
        vec!["LOGS_C", "98", "2401.0"],
        rows[61].to_strings()[1..].to_vec()
    );
}

#[test]
fn test_oldest_backup_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.csv");
    let logger = Logger::new(
        LoggerConfig::new(&path)
            .fmt("{message}")
            .max_size(20)
            .max_files(2),
    )
    .unwrap();

    // 1行9バイトなので、2行ごとにローテーションする
    for i in 0..10 {
        logger.info(vec![format!("row{:05}", i)]).unwrap();
    }

    let policy = RotationPolicy::new(&path, 20, 2);
    assert_eq!(vec!["row00004", "row00005"], read_lines(&policy.backup_path(2)));
    assert_eq!(vec!["row00006", "row00007"], read_lines(&policy.backup_path(1)));
    assert_eq!(vec!["row00008", "row00009"], read_lines(&path));
    assert!(!policy.backup_path(3).exists());
    assert_eq!(6, logger.get_logs(false).unwrap().len());
}

#[test]
fn test_round_trip_without_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round_trip.csv");
    let config = LoggerConfig::new(&path)
        .delimiter(';')
        .fmt("{message}")
        .max_size(64)
        .max_files(20)
        .header("a;b;c");
    let logger = Logger::new(config.clone()).unwrap();

    let mut expected = Vec::new();
    for i in 0..30 {
        let record = vec![
            Value::from(i),
            Value::from(f64::from(i) / 4.0),
            Value::from(format!("text {}", i)),
        ];
        expected.push(record.iter().map(ToString::to_string).collect::<Vec<_>>());
        logger.info(record).unwrap();
    }

    // 書き込み中のロガーがなくても読み込める
    drop(logger);
    let rows: Vec<Vec<String>> = LogReader::new(&config)
        .unwrap()
        .get_logs(false)
        .unwrap()
        .iter()
        .map(|row| row.to_strings())
        .collect();
    assert_eq!(expected, rows);
}

#[test]
fn test_headers_never_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("headers.csv");
    let logger = Logger::new(
        LoggerConfig::new(&path)
            .max_size(200)
            .max_files(9)
            .header(vec!["date", "v1", "v2"]),
    )
    .unwrap();

    for i in 0..40 {
        logger.info(vec![i, i + 1]).unwrap();
    }

    for evaluate in [false, true] {
        let rows = logger.get_logs(evaluate).unwrap();
        assert_eq!(40, rows.len());
        assert!(rows
            .iter()
            .all(|row| row.len() == 3 && row[1].to_string() != "v1"));
    }
}

#[test]
fn test_restart_appends_without_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart.csv");
    let config = LoggerConfig::new(&path).fmt("{message}").header("h1,h2");

    Logger::new(config.clone()).unwrap().info(vec![1, 2]).unwrap();
    Logger::new(config).unwrap().info(vec![3, 4]).unwrap();

    assert_eq!(vec!["h1,h2", "1,2", "3,4"], read_lines(&path));
}

#[test]
fn test_evaluated_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evaluated.csv");
    let logger = Logger::new(LoggerConfig::new(&path).fmt("{timestamp},{message}")).unwrap();

    logger.info("42,3.14,hello").unwrap();

    let rows = logger.get_logs(true).unwrap();
    assert_eq!(1, rows.len());
    assert!(rows[0][0].as_timestamp().is_some());
    assert_eq!(
        &[
            Value::Int(42),
            Value::Float(3.14),
            Value::Str("hello".to_string())
        ],
        &rows[0][1..]
    );
}
