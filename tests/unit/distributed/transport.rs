use super::*;
use crate::distributed::tags::ExchangeStage;

fn tag(stage: ExchangeStage, seq: usize) -> Tag {
    Tag::new(stage, seq).unwrap()
}

#[test]
fn receives_match_source_and_tag_out_of_order() {
    let eps = LocalCluster::endpoints(2, LocalClusterOpts::default()).unwrap();
    eps[0].send(1, tag(ExchangeStage::PatchPixels, 0), vec![9]).unwrap();
    eps[0].send(1, tag(ExchangeStage::PatchMeta, 0), vec![1]).unwrap();
    eps[1].send(1, tag(ExchangeStage::PatchMeta, 0), vec![5]).unwrap();

    assert_eq!(eps[1].recv(1, tag(ExchangeStage::PatchMeta, 0)).unwrap(), vec![5]);
    assert_eq!(eps[1].recv(0, tag(ExchangeStage::PatchMeta, 0)).unwrap(), vec![1]);
    assert_eq!(eps[1].recv(0, tag(ExchangeStage::PatchPixels, 0)).unwrap(), vec![9]);
}

#[test]
fn same_tag_messages_keep_send_order() {
    let eps = LocalCluster::endpoints(2, LocalClusterOpts::default()).unwrap();
    let t = tag(ExchangeStage::GatherMeta, 0);
    eps[1].send(0, tag(ExchangeStage::GatherPixels, 0), vec![0]).unwrap();
    eps[1].send(0, t, vec![1]).unwrap();
    eps[1].send(0, t, vec![2]).unwrap();
    assert_eq!(eps[0].recv(1, tag(ExchangeStage::GatherPixels, 0)).unwrap(), vec![0]);
    assert_eq!(eps[0].recv(1, t).unwrap(), vec![1]);
    assert_eq!(eps[0].recv(1, t).unwrap(), vec![2]);
}

#[test]
fn unknown_ranks_are_transport_errors() {
    let eps = LocalCluster::endpoints(1, LocalClusterOpts::default()).unwrap();
    let t = tag(ExchangeStage::PatchCount, 0);
    assert!(matches!(eps[0].send(3, t, vec![]), Err(CompositeError::Transport(_))));
    assert!(matches!(eps[0].recv(3, t), Err(CompositeError::Transport(_))));
}

#[test]
fn recv_timeout_reports_instead_of_hanging() {
    let eps = LocalCluster::endpoints(
        2,
        LocalClusterOpts {
            recv_timeout: Some(Duration::from_millis(20)),
        },
    )
    .unwrap();
    let err = eps[0].recv(1, tag(ExchangeStage::PatchCount, 0)).unwrap_err();
    assert!(err.to_string().contains("transport error"));
}

#[test]
fn run_executes_every_rank_with_barrier() {
    let out = LocalCluster::run(4, LocalClusterOpts::default(), |ctx| {
        let next = (ctx.rank() + 1) % ctx.size();
        let prev = (ctx.rank() + ctx.size() - 1) % ctx.size();
        let t = tag(ExchangeStage::PatchCount, 0);
        ctx.comm().send(next, t, vec![ctx.rank() as u8])?;
        let got = ctx.comm().recv(prev, t)?;
        ctx.comm().barrier()?;
        Ok(got[0] as usize)
    })
    .unwrap();
    assert_eq!(out, vec![3, 0, 1, 2]);
}

#[test]
fn barrier_with_missing_rank_times_out() {
    let eps = LocalCluster::endpoints(
        2,
        LocalClusterOpts {
            recv_timeout: Some(Duration::from_millis(20)),
        },
    )
    .unwrap();
    let err = eps[0].barrier().unwrap_err();
    assert!(matches!(err, CompositeError::Transport(_)));
    assert!(err.to_string().contains("barrier"));

    // The withdrawn arrival must not let a later lone rank through.
    assert!(eps[1].barrier().is_err());
}

#[test]
fn barrier_is_reusable_across_generations() {
    let out = LocalCluster::run(
        3,
        LocalClusterOpts {
            recv_timeout: Some(Duration::from_secs(5)),
        },
        |ctx| {
            for _ in 0..5 {
                ctx.comm().barrier()?;
            }
            Ok(ctx.rank())
        },
    )
    .unwrap();
    assert_eq!(out, vec![0, 1, 2]);
}

#[test]
fn zero_rank_cluster_is_rejected() {
    assert!(LocalCluster::endpoints(0, LocalClusterOpts::default()).is_err());
    assert!(DistributedContext::single().is_ok());
}
