fn main() {
    quadterra::gpu::run();
}
