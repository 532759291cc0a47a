use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// チェック対象のユーザー。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub check_enabled: bool,
    /// 1日に必要な時間数。未設定の場合は`AnalyzerConfig`の値を使う。
    #[serde(default)]
    pub required_hours: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// ユーザー一覧の読み込み元。
#[derive(Clone, Debug, PartialEq)]
pub enum UsersSource {
    Json(String),
    File(PathBuf),
}

/// ユーザーとチームの一覧。
///
/// プロセス起動時に1度だけ読み込み、以降は読み取り専用で使う。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    teams: BTreeMap<String, Team>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>, teams: BTreeMap<String, Team>) -> Self {
        Self { users, teams }
    }

    /// JSON文字列から読み込む。
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse user directory JSON")
    }

    /// 設定された読み込み元からユーザー一覧を読み込む。
    pub fn load(source: &UsersSource) -> Result<Self> {
        let directory = match source {
            UsersSource::Json(json) => Self::from_json(json)?,
            UsersSource::File(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read users file: {}", path.display()))?;
                Self::from_json(&json)
                    .with_context(|| format!("Invalid users file: {}", path.display()))?
            }
        };
        info!(
            "Loaded {} users in {} teams",
            directory.users.len(),
            directory.teams.len()
        );

        Ok(directory)
    }

    pub fn all_users(&self) -> Vec<&User> {
        self.users.iter().collect()
    }

    /// 日次チェックが有効なユーザーのみを返す。
    pub fn enabled_users(&self) -> Vec<&User> {
        self.users.iter().filter(|user| user.check_enabled).collect()
    }

    pub fn teams(&self) -> &BTreeMap<String, Team> {
        &self.teams
    }
}
