use replay_data::codec::{self, from_document, to_document};
use replay_data::{Action, State, StoredTransition, Transition};
use serde::{Deserialize, Serialize};

/// Storage shape of one transition. States and actions are kept as text
/// documents so the columns stay readable regardless of the state type.
#[derive(Debug, Serialize, Deserialize)]
struct DataRow {
    state: String,
    action: String,
    new_state: String,
    reward: f64,
    is_terminal: bool,
    episode: u64,
    #[serde(rename = "move")]
    move_index: u32,
}

pub fn encode_row<S: State, A: Action>(
    transition: &Transition<S, A>,
    episode: u64,
    move_index: u32,
) -> codec::Result<Vec<u8>> {
    let row = DataRow {
        state: to_document(&transition.state)?,
        action: to_document(&transition.action)?,
        new_state: to_document(&transition.next_state)?,
        reward: transition.reward,
        is_terminal: transition.terminal,
        episode,
        move_index,
    };
    codec::encode(&row)
}

pub fn decode_row<S: State, A: Action>(bytes: &[u8]) -> codec::Result<StoredTransition<S, A>> {
    let row: DataRow = codec::decode(bytes)?;
    Ok(StoredTransition {
        transition: Transition {
            state: from_document(&row.state)?,
            action: from_document(&row.action)?,
            next_state: from_document(&row.new_state)?,
            reward: row.reward,
            terminal: row.is_terminal,
        },
        episode: row.episode,
        move_index: row.move_index,
    })
}
