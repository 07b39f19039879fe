use std::sync::Arc;

use serde_json::{json, Value};

use botfleet_core::types::{round2, Vec3, MAX_LISTED_OBJECTS, MAX_PATH_SPAN, PICKUP_RANGE, STREAM_RANGE};
use botfleet_llm::FunctionDispatcher;
use botfleet_bot::flags::{BotFlag, MoveType};
use botfleet_bot::rpc;
use botfleet_transport::SendReliability;

use crate::context::{error, success, ToolContext};

fn parse_move_type(s: &str) -> MoveType {
    match s {
        "walk" => MoveType::Walk,
        "run" => MoveType::Run,
        "sprint" => MoveType::Sprint,
        "drive" => MoveType::Drive,
        _ => MoveType::Auto,
    }
}

fn vec3_json(v: Vec3) -> Value {
    let r = v.rounded();
    json!({ "x": r.x, "y": r.y, "z": r.z })
}

fn arg_f32(args: &Value, key: &str) -> Option<f32> {
    args.get(key).and_then(|v| v.as_f64()).map(|v| v as f32)
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

macro_rules! resolve_bot {
    ($ctx:expr, $session_id:expr) => {
        match $ctx.bot_id_for_session($session_id) {
            Some(id) => id,
            None => return error("Bot not found"),
        }
    };
}

/// Registers every tool in the registry against `ctx`.
pub fn register_all(dispatcher: &mut FunctionDispatcher, ctx: Arc<ToolContext>) {
    register_reads(dispatcher, ctx.clone());
    register_listings(dispatcher, ctx.clone());
    register_movement(dispatcher, ctx.clone());
    register_interaction(dispatcher, ctx);
}

fn register_reads(dispatcher: &mut FunctionDispatcher, ctx: Arc<ToolContext>) {
    {
        let ctx = ctx.clone();
        dispatcher.register(
            "get_position",
            "Returns the bot's current world position.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let bot = bot.lock().unwrap();
                success(vec3_json(bot.position))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "get_self_status",
            "Returns the bot's connection status, health, armor and flags.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let bot = bot.lock().unwrap();
                let dialog = bot.dialog.as_ref().map(|d| {
                    json!({
                        "id": d.id,
                        "style": d.style.as_str(),
                        "title": d.title,
                        "body": d.body,
                        "left_label": d.left_label,
                        "right_label": d.right_label,
                    })
                });
                success(json!({
                    "status": bot.status,
                    "health": bot.health,
                    "armor": bot.armor,
                    "dead": bot.flags.get(BotFlag::Dead),
                    "driving": bot.flags.get(BotFlag::Driving),
                    "moving": bot.flags.get(BotFlag::Moving),
                    "dialog": dialog,
                }))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "get_chatbox_history",
            "Returns up to the last 64 chatbox lines the bot has observed.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let bot = bot.lock().unwrap();
                success(json!(bot.chatbox.iter().collect::<Vec<_>>()))
            },
        );
    }
}

fn register_listings(dispatcher: &mut FunctionDispatcher, ctx: Arc<ToolContext>) {
    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_players",
            "Lists players within 300m of the bot.",
            json!({"type": "object", "properties": {"include_npcs": {"type": "boolean"}}}),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let (server, position) = {
                    let bot = bot.lock().unwrap();
                    (bot.server.clone(), bot.position)
                };
                let include_npcs = args.get("include_npcs").and_then(|v| v.as_bool()).unwrap_or(false);
                let players = ctx
                    .world
                    .with_resources_ref(&server, |res| {
                        res.players_in_range(position, STREAM_RANGE, include_npcs)
                            .iter()
                            .map(|p| {
                                json!({
                                    "id": p.id,
                                    "name": p.name,
                                    "health": p.health,
                                    "armor": p.armor,
                                    "position": vec3_json(p.position),
                                    "is_npc": p.is_npc,
                                })
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                success(json!(players))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_vehicles",
            "Lists vehicles within 300m of the bot.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let (server, position) = {
                    let bot = bot.lock().unwrap();
                    (bot.server.clone(), bot.position)
                };
                let vehicles = ctx
                    .world
                    .with_resources_ref(&server, |res| {
                        res.vehicles_in_range(position, STREAM_RANGE)
                            .iter()
                            .map(|v| {
                                json!({
                                    "id": v.id,
                                    "model": v.model,
                                    "health": v.health,
                                    "position": vec3_json(v.position),
                                })
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                success(json!(vehicles))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_objects",
            "Lists up to 100 nearest objects within 300m, ordered by ascending distance.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let position = bot.lock().unwrap().position;
                let Some(pool) = ctx.streamables.get(&bot_id) else {
                    return success(json!([]));
                };
                let pool = pool.lock().unwrap();
                let mut objects: Vec<_> = pool
                    .objects_in_range(position, STREAM_RANGE)
                    .into_iter()
                    .map(|o| (o.position.distance(&position), o))
                    .collect();
                objects.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
                let listed: Vec<_> = objects
                    .into_iter()
                    .take(MAX_LISTED_OBJECTS)
                    .map(|(dist, o)| {
                        json!({
                            "id": o.id,
                            "model": o.model,
                            "position": vec3_json(o.position),
                            "distance": round2(dist),
                        })
                    })
                    .collect();
                success(json!(listed))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_objects_text",
            "Like list_objects, but formatted as human-readable lines.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let position = bot.lock().unwrap().position;
                let Some(pool) = ctx.streamables.get(&bot_id) else {
                    return success(json!([]));
                };
                let pool = pool.lock().unwrap();
                let mut objects: Vec<_> = pool
                    .objects_in_range(position, STREAM_RANGE)
                    .into_iter()
                    .map(|o| (o.position.distance(&position), o))
                    .collect();
                objects.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
                let lines: Vec<String> = objects
                    .into_iter()
                    .take(MAX_LISTED_OBJECTS)
                    .map(|(dist, o)| format!("object {} (model {}) at {:?}, {:.2}m away", o.id, o.model, o.position, dist))
                    .collect();
                success(json!(lines))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_pickups",
            "Lists pickups within 300m of the bot.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let position = bot.lock().unwrap().position;
                let Some(pool) = ctx.streamables.get(&bot_id) else {
                    return success(json!([]));
                };
                let pool = pool.lock().unwrap();
                let pickups: Vec<_> = pool
                    .pickups_in_range(position, STREAM_RANGE)
                    .iter()
                    .map(|p| json!({"id": p.id, "model": p.model, "position": vec3_json(p.position)}))
                    .collect();
                success(json!(pickups))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_labels",
            "Lists 3D text labels within 300m of the bot.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let position = bot.lock().unwrap().position;
                let Some(pool) = ctx.streamables.get(&bot_id) else {
                    return success(json!([]));
                };
                let pool = pool.lock().unwrap();
                let labels: Vec<_> = pool
                    .labels_in_range(position, STREAM_RANGE)
                    .iter()
                    .map(|l| json!({"id": l.id, "text": l.text, "position": vec3_json(l.position)}))
                    .collect();
                success(json!(labels))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "list_server_player",
            "Lists nearby players enriched with any 3D labels attached to them.",
            json!({"type": "object", "properties": {}}),
            move |_args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let (server, position) = {
                    let bot = bot.lock().unwrap();
                    (bot.server.clone(), bot.position)
                };
                let players = ctx
                    .world
                    .with_resources_ref(&server, |res| res.players_in_range(position, STREAM_RANGE, false).into_iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();

                let pool = ctx.streamables.get(&bot_id);
                let enriched: Vec<_> = players
                    .into_iter()
                    .map(|p| {
                        let labels: Vec<String> = pool
                            .as_ref()
                            .map(|pool| {
                                pool.lock()
                                    .unwrap()
                                    .labels_attached_to_player(p.id)
                                    .iter()
                                    .map(|l| l.text.clone())
                                    .collect()
                            })
                            .unwrap_or_default();
                        json!({
                            "id": p.id,
                            "name": p.name,
                            "position": vec3_json(p.position),
                            "labels": labels,
                        })
                    })
                    .collect();
                success(json!(enriched))
            },
        );
    }
}

fn register_movement(dispatcher: &mut FunctionDispatcher, ctx: Arc<ToolContext>) {
    {
        let ctx = ctx.clone();
        dispatcher.register(
            "goto",
            "Pathfinds to (x,y,z) and walks/runs there, avoiding obstacles.",
            json!({
                "type": "object",
                "required": ["x", "y", "z"],
                "properties": {
                    "x": {"type": "number"}, "y": {"type": "number"}, "z": {"type": "number"},
                    "move_type": {"type": "string", "enum": ["walk", "run"]},
                }
            }),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let (Some(x), Some(y), Some(z)) = (arg_f32(args, "x"), arg_f32(args, "y"), arg_f32(args, "z")) else {
                    return error("x, y, z are required");
                };
                let move_type = arg_str(args, "move_type").map(parse_move_type).unwrap_or(MoveType::Run);
                let dest = Vec3::new(x, y, z);

                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let Some(transport_lock) = ctx.transports.get(&bot_id) else {
                    return error("Bot not found");
                };
                let transport = transport_lock.lock().unwrap();
                let mut bot = bot_lock.lock().unwrap();
                if bot.go_with_path(dest, &**transport, move_type) {
                    success(json!({"moving": true}))
                } else {
                    error("Pathfinder failed!")
                }
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "forced_goto",
            "Moves straight-line to (x,y,z), ignoring pathing/obstacles.",
            json!({
                "type": "object",
                "required": ["x", "y", "z"],
                "properties": {
                    "x": {"type": "number"}, "y": {"type": "number"}, "z": {"type": "number"},
                    "move_type": {"type": "string"},
                }
            }),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let (Some(x), Some(y), Some(z)) = (arg_f32(args, "x"), arg_f32(args, "y"), arg_f32(args, "z")) else {
                    return error("x, y, z are required");
                };
                let move_type = arg_str(args, "move_type").map(parse_move_type).unwrap_or(MoveType::Run);
                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let mut bot = bot_lock.lock().unwrap();
                bot.go(Vec3::new(x, y, z), move_type);
                success(json!({"moving": true}))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "random_explore",
            "Walks to a random point within `dist` meters (max 150) of the bot.",
            json!({
                "type": "object",
                "properties": {
                    "dist": {"type": "number", "maximum": MAX_PATH_SPAN},
                    "move_type": {"type": "string"},
                }
            }),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let dist = arg_f32(args, "dist").unwrap_or(30.0).min(MAX_PATH_SPAN).max(1.0);
                let move_type = arg_str(args, "move_type").map(parse_move_type).unwrap_or(MoveType::Run);

                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let Some(transport_lock) = ctx.transports.get(&bot_id) else {
                    return error("Bot not found");
                };
                let transport = transport_lock.lock().unwrap();
                let mut bot = bot_lock.lock().unwrap();

                let mut rng = rand::thread_rng();
                use rand::Rng;
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let radius = rng.gen_range(0.0..dist);
                let target_xy = Vec3::new(
                    bot.position.x + radius * angle.cos(),
                    bot.position.y + radius * angle.sin(),
                    bot.position.z + 50.0,
                );
                let ground = transport
                    .raycast(target_xy, Vec3::new(target_xy.x, target_xy.y, target_xy.z - 500.0))
                    .unwrap_or(Vec3::new(target_xy.x, target_xy.y, bot.position.z));

                if bot.go_with_path(ground, &**transport, move_type) {
                    success(json!({"moving": true, "target": vec3_json(ground)}))
                } else {
                    error("Pathfinder failed!")
                }
            },
        );
    }
}

fn register_interaction(dispatcher: &mut FunctionDispatcher, ctx: Arc<ToolContext>) {
    {
        let ctx = ctx.clone();
        dispatcher.register(
            "chat",
            "Sends a message to the in-game chat (or a server command if it starts with '/').",
            json!({"type": "object", "required": ["msg"], "properties": {"msg": {"type": "string"}}}),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(msg) = arg_str(args, "msg") else {
                    return error("msg is required");
                };
                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let mut bot = bot_lock.lock().unwrap();
                // A leading '/' means the player meant it as a server command,
                // not chat — route it through the matching RPC id.
                if let Some(command) = msg.strip_prefix('/') {
                    bot.queue_send(0, rpc::RPC_SERVER_COMMAND, command.as_bytes().to_vec(), SendReliability::Reliable, 0);
                } else {
                    bot.queue_send(0, rpc::RPC_CHAT, msg.as_bytes().to_vec(), SendReliability::Reliable, 0);
                }
                success(json!({"sent": true}))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "command",
            "Runs a server command, prefixing '/' if the caller omitted it.",
            json!({"type": "object", "required": ["cmd"], "properties": {"cmd": {"type": "string"}}}),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(cmd) = arg_str(args, "cmd") else {
                    return error("cmd is required");
                };
                let full = if let Some(stripped) = cmd.strip_prefix('/') { stripped.to_string() } else { cmd.to_string() };
                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let mut bot = bot_lock.lock().unwrap();
                bot.queue_send(0, rpc::RPC_SERVER_COMMAND, full.into_bytes(), SendReliability::Reliable, 0);
                success(json!({"sent": true}))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "dialog_response",
            "Replies to the bot's currently open dialog, if any.",
            json!({
                "type": "object",
                "required": ["button"],
                "properties": {
                    "button": {"type": "string", "enum": ["left", "right"]},
                    "listitem": {"type": "integer"},
                    "input": {"type": "string"},
                }
            }),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let mut bot = bot_lock.lock().unwrap();
                let Some(dialog) = bot.dialog.take() else {
                    return error("No active dialog");
                };
                let button = arg_str(args, "button").unwrap_or("left");
                let listitem = args.get("listitem").and_then(|v| v.as_i64()).unwrap_or(-1);
                let input = arg_str(args, "input").unwrap_or("");

                let mut payload = Vec::new();
                payload.extend_from_slice(&dialog.id.to_le_bytes());
                payload.push(if button == "right" { 0 } else { 1 });
                payload.extend_from_slice(&(listitem as i16).to_le_bytes());
                payload.extend_from_slice(input.as_bytes());
                bot.queue_send(0, rpc::RPC_DIALOG_RESPONSE, payload, SendReliability::ReliableOrdered, 0);

                success(json!({
                    "responded": true,
                    "dialog_style": dialog.style.as_str(),
                }))
            },
        );
    }

    {
        let ctx = ctx.clone();
        dispatcher.register(
            "send_pickup",
            "Picks up a pickup within 3m of the bot.",
            json!({"type": "object", "required": ["pickup_id"], "properties": {"pickup_id": {"type": "integer"}}}),
            move |args, session_id| {
                let bot_id = resolve_bot!(ctx, session_id);
                let Some(pickup_id) = args.get("pickup_id").and_then(|v| v.as_i64()) else {
                    return error("pickup_id is required");
                };
                let pickup_id = pickup_id as i32;

                let Some(bot_lock) = ctx.bots.get(&bot_id) else {
                    return error("Bot not found");
                };
                let position = bot_lock.lock().unwrap().position;

                let Some(pool) = ctx.streamables.get(&bot_id) else {
                    return error("Bot not found");
                };
                let pool = pool.lock().unwrap();
                let Some(pickup_pos) = pool.pickup_position(pickup_id) else {
                    return error("Pickup not found");
                };
                let distance = pickup_pos.distance(&position);
                if distance > PICKUP_RANGE {
                    return error(format!("Pickup too far: {:.2}m away", distance));
                }

                drop(pool);
                bot_lock
                    .lock()
                    .unwrap()
                    .queue_send(0, rpc::RPC_PICKUP, pickup_id.to_le_bytes().to_vec(), SendReliability::Reliable, 0);
                success(json!({"picked_up": pickup_id}))
            },
        );
    }
}
