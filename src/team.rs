use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::directory::Team;
use crate::duration::round_hours;

/// チーム集計の入力となる1ユーザー分の合計時間。
#[derive(Clone, Debug, PartialEq)]
pub struct MemberHours {
    pub user: String,
    pub team: Option<String>,
    pub total_hours: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub hours: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamTotal {
    pub name: String,
    pub total_hours: f64,
    pub members: Vec<TeamMember>,
}

/// チームごとの合計と全体の合計。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamAggregateResult {
    pub teams: BTreeMap<String, TeamTotal>,
    pub grand_total: f64,
}

/// ユーザーごとの合計時間をチームごとに集計する。
///
/// `teams`に含まれるチームはメンバーがいなくても結果に含める。
/// チームが未設定、または`teams`にないユーザーは集計から除外する。
pub fn group_by_team(results: &[MemberHours], teams: &BTreeMap<String, Team>) -> TeamAggregateResult {
    let mut aggregate = TeamAggregateResult {
        teams: teams
            .iter()
            .map(|(id, team)| {
                let total = TeamTotal {
                    name: team.name.clone(),
                    total_hours: 0.0,
                    members: Vec::new(),
                };
                (id.clone(), total)
            })
            .collect(),
        grand_total: 0.0,
    };

    for result in results {
        let Some(team) = result
            .team
            .as_ref()
            .and_then(|id| aggregate.teams.get_mut(id))
        else {
            continue;
        };
        team.members.push(TeamMember {
            name: result.user.clone(),
            hours: result.total_hours,
        });
        team.total_hours += result.total_hours;
        aggregate.grand_total += result.total_hours;
    }

    aggregate.grand_total = round_hours(aggregate.grand_total);
    for team in aggregate.teams.values_mut() {
        team.total_hours = round_hours(team.total_hours);
        for member in &mut team.members {
            member.hours = round_hours(member.hours);
        }
    }

    aggregate
}
