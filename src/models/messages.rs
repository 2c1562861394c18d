use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames accepted from clients. The `type` tag selects the variant; a frame
/// with any other tag fails to parse and is answered with an error frame.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join_room", rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },
    #[serde(rename = "leave_room", rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    #[serde(rename = "chat", rename_all = "camelCase")]
    Chat { room_id: String, message: String },
    #[serde(rename = "drawing", rename_all = "camelCase")]
    Drawing { room_id: String, shape: Value },
    #[serde(rename = "erase_shape", rename_all = "camelCase")]
    EraseShape { room_id: String, shape_id: String },
}

/// Frames sent to clients, either as a direct reply or as a room broadcast.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joined_room", rename_all = "camelCase")]
    JoinedRoom { room_id: String },
    #[serde(rename = "left_room", rename_all = "camelCase")]
    LeftRoom { room_id: String },
    /// Shape history replay sent to a joining connection, oldest first.
    #[serde(rename = "existing_shapes", rename_all = "camelCase")]
    ExistingShapes { room_id: String, shapes: Vec<Value> },
    #[serde(rename = "chat", rename_all = "camelCase")]
    Chat {
        room_id: String,
        message: String,
        user_id: String,
    },
    #[serde(rename = "drawing", rename_all = "camelCase")]
    Drawing {
        room_id: String,
        shape: Value,
        user_id: String,
    },
    #[serde(rename = "erase_shape", rename_all = "camelCase")]
    EraseShape { room_id: String, shape_id: String },
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_room_without_slug() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"join_room","roomId":"r1"}"#).unwrap();
        match msg {
            ClientMessage::JoinRoom { room_id, slug } => {
                assert_eq!(room_id, "r1");
                assert!(slug.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn parses_drawing_with_arbitrary_shape_payload() {
        let raw = r#"{"type":"drawing","roomId":"r1","shape":{"type":"rect","x":1,"y":2,"w":10,"h":20}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::Drawing { room_id, shape } => {
                assert_eq!(room_id, "r1");
                assert_eq!(shape["type"], "rect");
                assert_eq!(shape["w"], 10);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let res: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"teleport","roomId":"r1"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn missing_field_is_rejected() {
        let res: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"chat","roomId":"r1"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn chat_broadcast_uses_wire_field_names() {
        let msg = ServerMessage::Chat {
            room_id: "r1".to_string(),
            message: "hi".to_string(),
            user_id: "u1".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type":"chat","roomId":"r1","message":"hi","userId":"u1"}));
    }

    #[test]
    fn erase_shape_round_trips_literal_shape_id() {
        let msg = ServerMessage::EraseShape {
            room_id: "r1".to_string(),
            shape_id: "s1".to_string(),
        };
        let text = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        match back {
            ServerMessage::EraseShape { shape_id, .. } => assert_eq!(shape_id, "s1"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn existing_shapes_preserves_order() {
        let msg = ServerMessage::ExistingShapes {
            room_id: "r1".to_string(),
            shapes: vec![json!({"id":"a"}), json!({"id":"b"}), json!({"id":"c"})],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "existing_shapes");
        let ids: Vec<_> = value["shapes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
