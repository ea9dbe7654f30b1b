use image::{imageops::ColorMap, Rgb, RgbImage};
use priority_queue::PriorityQueue;
use std::{array, cmp::Reverse, collections::VecDeque, iter};

const MAX_LEVEL: u8 = 8;

pub const MAX_PALETTE_COLORS: usize = 256;

#[derive(Debug, Default)]
struct Node {
    rgb: [u64; 3],
    count: u64,
    index: usize,
    level: u8,
    parent: Option<u32>,
    children: [Option<u32>; 8],
}

impl Node {
    fn is_leaf(&self) -> bool {
        !self.children.iter().any(Option::is_some)
    }

    fn merge_color(&mut self, color: Rgb<u8>) {
        self.count += 1;
        iter::zip(&mut self.rgb, color.0).for_each(|(a, b)| *a += b as u64)
    }

    fn merge_node(&mut self, node: Node) {
        self.count += node.count;
        iter::zip(&mut self.rgb, node.rgb).for_each(|(a, b)| *a += b)
    }
}

#[derive(Debug, Default)]
struct Pool {
    nodes: Vec<Node>,
}

impl Pool {
    fn create(&mut self, level: u8, parent: Option<u32>) -> u32 {
        let id = self.nodes.len();
        self.nodes.push(Node {
            level,
            parent,
            ..Node::default()
        });
        id as u32
    }

    fn get(&self, id: u32) -> &Node {
        &self.nodes[id as usize]
    }

    fn get_mut(&mut self, id: u32) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    fn delete(&mut self, id: u32) -> Node {
        std::mem::take(&mut self.nodes[id as usize])
    }
}

fn get_color_index(color: Rgb<u8>, level: u8) -> usize {
    let shift = MAX_LEVEL - level;
    color
        .0
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, c)| (((c >> shift) & 1) << i) as usize)
        .fold(0, |s, c| s | c)
}

/// Pruning order: deepest first, then fewest pixels, then node id.
type Priority = (u8, Reverse<u64>, Reverse<u32>);

struct Octree {
    pool: Pool,
    root: u32,
    leaves: usize,
}

impl Octree {
    fn new() -> Self {
        let mut pool = Pool::default();
        let root = pool.create(0, None);
        Self {
            pool,
            root,
            leaves: 0,
        }
    }

    fn traverse<F>(&self, mut f: F)
    where
        F: FnMut(u32, &Node),
    {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(node_id) = queue.pop_front() {
            let node = self.pool.get(node_id);
            f(node_id, node);
            queue.extend(node.children.iter().flatten());
        }
    }

    fn traverse_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(u32, &mut Node),
    {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(node_id) = queue.pop_front() {
            let node = self.pool.get_mut(node_id);
            f(node_id, node);
            queue.extend(node.children.iter().flatten());
        }
    }

    fn insert(&mut self, color: Rgb<u8>) {
        let mut node_id = self.root;
        for level in 1..=MAX_LEVEL {
            let child_index = get_color_index(color, level);
            node_id = match self.pool.get(node_id).children[child_index] {
                Some(child_id) => child_id,
                None => {
                    let child_id = self.pool.create(level, Some(node_id));
                    self.pool.get_mut(node_id).children[child_index] = Some(child_id);
                    child_id
                }
            }
        }
        let leaf = self.pool.get_mut(node_id);
        if leaf.count == 0 {
            self.leaves += 1;
        }
        leaf.merge_color(color);
    }

    fn get_index(&self, color: Rgb<u8>) -> usize {
        let mut node_id = self.root;
        for level in 1..=MAX_LEVEL {
            let node = self.pool.get(node_id);
            if node.is_leaf() {
                break;
            }
            let child_index = get_color_index(color, level);
            node_id = match node.children[child_index] {
                Some(child_id) => child_id,
                // Not an inserted color: step to the child whose octant
                // differs in the fewest channel bits.
                None => match node
                    .children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| c.map(|c| ((child_index ^ i).count_ones(), c)))
                    .min_by_key(|&(d, _)| d)
                {
                    Some((_, child_id)) => child_id,
                    None => break,
                },
            }
        }
        self.pool.get(node_id).index
    }

    /// A node can be pruned once all of its children are leaves.
    fn reducible(&self, node_id: u32) -> Option<Priority> {
        let node = self.pool.get(node_id);
        if node.is_leaf() {
            return None;
        }
        let mut count = 0;
        for &child_id in node.children.iter().flatten() {
            let child = self.pool.get(child_id);
            if !child.is_leaf() {
                return None;
            }
            count += child.count;
        }
        Some((node.level, Reverse(count), Reverse(node_id)))
    }

    fn prune_node(&mut self, node_id: u32) -> usize {
        std::mem::take(&mut self.pool.get_mut(node_id).children)
            .into_iter()
            .flatten()
            .map(|child_id| {
                let child = self.pool.delete(child_id);
                self.pool.get_mut(node_id).merge_node(child);
            })
            .count()
    }

    fn reduce_to(&mut self, color_count: usize) {
        let mut queue = PriorityQueue::<u32, Priority>::new();
        self.traverse(|node_id, _| {
            if let Some(priority) = self.reducible(node_id) {
                queue.push(node_id, priority);
            }
        });
        while self.leaves > color_count {
            let Some((node_id, _)) = queue.pop() else {
                break;
            };
            self.leaves -= self.prune_node(node_id) - 1;
            if let Some(parent_id) = self.pool.get(node_id).parent {
                if let Some(priority) = self.reducible(parent_id) {
                    queue.push(parent_id, priority);
                }
            }
        }
    }

    fn finalize(&mut self) -> Vec<Rgb<u8>> {
        let mut palette = Vec::new();
        self.traverse_mut(|_, node| {
            if node.is_leaf() && node.count > 0 {
                node.index = palette.len();
                palette.push(Rgb(array::from_fn(|i| (node.rgb[i] / node.count) as u8)));
            }
        });
        palette
    }
}

/// Adaptive octree quantizer over the pixels of one image.
pub struct ColorQuantizer {
    octree: Octree,
    colors: Vec<Rgb<u8>>,
}

impl ColorQuantizer {
    pub fn from(img: &RgbImage, palette_size: usize) -> Self {
        let palette_size = palette_size.clamp(1, MAX_PALETTE_COLORS);
        let mut octree = Octree::new();
        for pixel in img.pixels() {
            octree.insert(*pixel);
        }
        octree.reduce_to(palette_size);
        let colors = octree.finalize();
        tracing::debug!(colors = colors.len(), "Built octree palette");
        Self { octree, colors }
    }

    #[inline(always)]
    pub fn get_palette(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    #[inline(always)]
    pub fn get_index(&self, color: Rgb<u8>) -> usize {
        self.octree.get_index(color)
    }
}

impl ColorMap for ColorQuantizer {
    type Color = Rgb<u8>;

    #[inline(always)]
    fn index_of(&self, color: &Self::Color) -> usize {
        self.get_index(*color)
    }

    fn lookup(&self, index: usize) -> Option<Self::Color> {
        self.colors.get(index).copied()
    }

    fn has_lookup(&self) -> bool {
        true
    }

    #[inline(always)]
    fn map_color(&self, color: &mut Self::Color) {
        *color = self.get_palette()[self.get_index(*color)]
    }
}
