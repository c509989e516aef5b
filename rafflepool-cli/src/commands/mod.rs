use comfy_table::{presets::UTF8_FULL, Table};
use rafflepool_core::{
    Amount, MemorySink, MockCoordinator, Raffle, RaffleConfig, RaffleEvent, Result,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
struct RoundOutcome {
    round: u32,
    request_id: u64,
    winner: Uuid,
    prize_sats: u64,
    participants: Vec<ParticipantOutcome>,
}

#[derive(Debug, Clone, Serialize)]
struct ParticipantOutcome {
    participant: Uuid,
    tickets: u64,
    win_probability: f64,
    won: bool,
}

pub async fn simulate(
    participants: u64,
    tickets: u64,
    entry_fee: u64,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let config = RaffleConfig::new(Amount::from_sat(entry_fee), Duration::from_millis(250));
    let coordinator = Arc::new(MockCoordinator::new(seed));
    let sink = Arc::new(MemorySink::new());
    let mut raffle = Raffle::new(config, coordinator.clone(), sink)?;

    tracing::debug!("simulating one round with coordinator seed {}", seed);

    let fee = raffle.entry_fee();
    let entrants: Vec<Uuid> = (0..participants).map(|_| Uuid::new_v4()).collect();
    for entrant in &entrants {
        for _ in 0..tickets {
            raffle.enter(*entrant, fee)?;
        }
    }

    let outcome = settle_round(&mut raffle, &coordinator, 1).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

pub async fn run_rounds(
    rounds: u32,
    participants: u64,
    entry_fee: u64,
    interval: u64,
    seed: Option<u64>,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let config = RaffleConfig::new(Amount::from_sat(entry_fee), Duration::from_secs(interval));
    let coordinator = Arc::new(MockCoordinator::new(seed));
    let sink = Arc::new(MemorySink::new());
    let mut raffle = Raffle::new(config, coordinator.clone(), sink)?;

    // log the notification stream the way an external consumer would
    let mut events = raffle.subscribe();
    let _event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RaffleEvent::EntryAccepted {
                    participant,
                    paid,
                    total_entries,
                } => tracing::info!(
                    "entry accepted: {} paid {} sats ({} slots)",
                    participant,
                    paid.to_sat(),
                    total_entries
                ),
                RaffleEvent::SettlementRequested { request_id } => {
                    tracing::info!("settlement requested: request {}", request_id)
                }
                RaffleEvent::WinnerSelected {
                    winner,
                    prize,
                    request_id,
                } => tracing::info!(
                    "winner selected by request {}: {} wins {} sats",
                    request_id,
                    winner,
                    prize.to_sat()
                ),
            }
        }
    });

    let fee = raffle.entry_fee();
    let mut outcomes = Vec::new();
    for round in 1..=rounds {
        for _ in 0..participants {
            raffle.enter(Uuid::new_v4(), fee)?;
        }
        let outcome = settle_round(&mut raffle, &coordinator, round).await?;
        outcomes.push(outcome);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Request", "Winner", "Prize (sats)"]);
    for outcome in &outcomes {
        table.add_row(vec![
            outcome.round.to_string(),
            outcome.request_id.to_string(),
            outcome.winner.to_string(),
            outcome.prize_sats.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

/// Keeper role: poll the eligibility predicate until it turns true, trigger
/// the settlement, then deliver the coordinator's fulfillment back to the
/// pool.
async fn settle_round(
    raffle: &mut Raffle,
    coordinator: &MockCoordinator,
    round: u32,
) -> Result<RoundOutcome> {
    while !raffle.check_eligibility().is_eligible() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let total = raffle.participant_count() as u64;
    let mut tickets: Vec<(Uuid, u64)> = Vec::new();
    for &slot in raffle.participants() {
        match tickets.iter_mut().find(|(id, _)| *id == slot) {
            Some((_, n)) => *n += 1,
            None => tickets.push((slot, 1)),
        }
    }
    let prize = raffle.pool_balance();

    let request_id = raffle.begin_settlement().await?;
    let word = coordinator.fulfillment(request_id)?;
    let winner = raffle.on_randomness(request_id, word).await?;

    Ok(RoundOutcome {
        round,
        request_id,
        winner,
        prize_sats: prize.to_sat(),
        participants: tickets
            .into_iter()
            .map(|(participant, n)| ParticipantOutcome {
                participant,
                tickets: n,
                win_probability: n as f64 / total as f64,
                won: participant == winner,
            })
            .collect(),
    })
}

fn print_outcome(outcome: &RoundOutcome) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Participant", "Tickets", "Win probability", "Result"]);
    for p in &outcome.participants {
        table.add_row(vec![
            p.participant.to_string(),
            p.tickets.to_string(),
            format!("{:.1}%", p.win_probability * 100.0),
            if p.won { "WINNER" } else { "-" }.to_string(),
        ]);
    }
    println!("{}", table);
    println!(
        "Round {} settled by request {}: {} sats paid to {}",
        outcome.round, outcome.request_id, outcome.prize_sats, outcome.winner
    );
}
