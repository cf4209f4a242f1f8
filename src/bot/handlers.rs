use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    bot::JukeboxBot,
    error::PlaybackError,
    sources::Requester,
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return reply_error(ctx, &command, "Solo en servidores", "Este comando solo funciona dentro de un servidor").await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, guild_id, bot).await?,
        "skip" => handle_skip(ctx, &command, guild_id, bot).await?,
        "stop" => handle_stop(ctx, &command, guild_id, bot).await?,
        "leave" => handle_leave(ctx, &command, guild_id, bot).await?,
        "queue" => handle_queue(ctx, &command, guild_id, bot).await?,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .map(str::trim)
        .filter(|query| !query.is_empty());

    let Some(query) = query else {
        return reply_error(ctx, command, "Consulta vacía", "Indica una URL o un término de búsqueda").await;
    };

    // Verificar que el usuario esté en un canal de voz
    let Some(voice_channel_id) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        return reply_error(ctx, command, "Sin canal de voz", "Debes estar en un canal de voz").await;
    };

    // Defer la respuesta ya que resolver puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let requester = Requester::new(command.user.id, requester_name(command));

    let result = match bot.registry.join(guild_id, voice_channel_id).await {
        Ok(()) => bot.registry.enqueue(guild_id, query, requester).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            let embed = match (&outcome.discarded, &outcome.now_playing) {
                (Some(failure), _) => embeds::create_error_embed(
                    "No se pudo reproducir",
                    &format!("**{}** se descartó: {}", failure.title, failure.reason),
                ),
                (None, Some(playing)) if outcome.position == 1 => {
                    embeds::create_now_playing_embed(playing)
                }
                (None, playing) => {
                    let embed = embeds::create_track_added_embed(&outcome.track, outcome.position);
                    match playing {
                        Some(playing) => embed.field("▶️ Reproduciendo ahora", playing.title.clone(), false),
                        None => embed,
                    }
                }
            };

            command
                .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
                .await?;
        }
        Err(e) => {
            if e.is_usage() {
                info!("🚫 /play rechazado en guild {}: {}", guild_id, e);
            } else {
                warn!("⚠️ /play falló en guild {}: {}", guild_id, e);
            }

            // La respuesta diferida es pública; el error va en un followup efímero
            command.delete_response(&ctx.http).await?;
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .embed(playback_error_embed(&e))
                        .ephemeral(true),
                )
                .await?;
        }
    }

    Ok(())
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    match bot.registry.skip(guild_id).await {
        Ok(()) => reply(ctx, command, "⏭️ Canción saltada").await,
        Err(e) => reply_embed_ephemeral(ctx, command, playback_error_embed(&e)).await,
    }
}

async fn handle_stop(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    bot.registry.stop(guild_id).await;

    reply(ctx, command, "⏹️ Reproducción detenida y cola limpiada").await
}

async fn handle_leave(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    match bot.registry.leave(guild_id).await {
        Ok(()) => reply(ctx, command, "👋 Desconectado del canal de voz").await,
        Err(e) => reply_embed_ephemeral(ctx, command, playback_error_embed(&e)).await,
    }
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    let page = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "page")
        .and_then(|opt| opt.value.as_i64())
        .map(|page| page.max(1) as usize)
        .unwrap_or(1);

    let snapshot = bot.registry.snapshot(guild_id).await;
    let mut embed = embeds::create_queue_embed(&snapshot, page, bot.config.queue_page_size);

    if let Some(failure) = &snapshot.last_failure {
        embed = embed.field(
            "⚠️ Último error",
            format!("{}: {}", failure.title, failure.reason),
            false,
        );
    }

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Apodo en el servidor si existe, si no el nombre global o de usuario
fn requester_name(command: &CommandInteraction) -> String {
    command
        .member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| command.user.global_name.clone())
        .unwrap_or_else(|| command.user.name.clone())
}

fn playback_error_embed(error: &PlaybackError) -> CreateEmbed {
    let title = match error {
        PlaybackError::Resolution(_) => "No se pudo resolver",
        PlaybackError::Transport(_) => "Error de voz",
        PlaybackError::Usage(_) => "No disponible",
    };

    embeds::create_error_embed(title, &error.to_string())
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;

    Ok(())
}

async fn reply_embed_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    embed: CreateEmbed,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

async fn reply_error(
    ctx: &Context,
    command: &CommandInteraction,
    title: &str,
    description: &str,
) -> Result<()> {
    reply_embed_ephemeral(ctx, command, embeds::create_error_embed(title, description)).await
}
