use cordyceps_avl::AvlMap;

fn main() {
    let mut map = AvlMap::new();

    for key in 0..10 {
        map.add(key, key * key);
        map.assert_invariants();
    }

    println!("size: {}, height: {}", map.len(), map.height());

    let mut level = Vec::new();
    map.level_order(|k, _| level.push(*k));
    println!("level order: {level:?}");

    let mut pre = Vec::new();
    map.pre_order(|k, _| pre.push(*k));
    println!("pre order:   {pre:?}");

    let mut post = Vec::new();
    map.post_order(|k, _| post.push(*k));
    println!("post order:  {post:?}");

    println!("in order:    {map:?}");
    println!("full: {}, complete: {}", map.is_full(), map.is_complete());

    let removed = map.remove(&3);
    assert_eq!(removed, Some(9));
    map.assert_invariants();

    let mut dot = String::new();
    if map.dotgraph("demo", &mut dot).is_ok() {
        println!("{dot}");
    }
}
